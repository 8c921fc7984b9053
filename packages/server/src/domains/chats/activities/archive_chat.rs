//! Archive chat activity

use serde::Serialize;
use tracing::info;

use super::append_system_message;
use crate::common::{ChatId, UserId};
use crate::domains::chats::errors::{ChatError, ChatResult};
use crate::domains::chats::models::{Chat, Membership};
use crate::domains::chats::payloads::{system_text, CHAT_ARCHIVED};
use crate::domains::chats::permissions::{can_archive, require_member};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveOutcome {
    pub already_archived: bool,
}

/// Archive a chat and mark the requester as having left it.
///
/// Re-archiving only updates the requester's own membership.
pub async fn archive_chat(
    chat_id: ChatId,
    requester: UserId,
    deps: &ServerDeps,
) -> ChatResult<ArchiveOutcome> {
    let mut tx = deps.db_pool.begin().await?;

    let chat = Chat::find_by_id_for_update(chat_id, &mut *tx)
        .await?
        .ok_or_else(|| ChatError::not_found("Chat not found or access denied"))?;

    let memberships = Membership::find_for_chat_in(chat_id, &mut *tx).await?;

    // Members who already left may still archive their own view of the chat
    let is_member = memberships.iter().any(|m| m.user_id == requester);
    if !is_member {
        return Err(ChatError::not_found("Chat not found or access denied"));
    }

    if !chat.is_archived() {
        let permission = require_member(&memberships, requester)?;
        if !can_archive(chat.chat_type, permission) {
            return Err(ChatError::forbidden(
                "Only the owner or an admin can archive this chat",
            ));
        }
    }

    Membership::mark_left(chat_id, requester, &mut *tx).await?;

    let newly_archived = Chat::mark_archived(chat_id, &mut *tx).await?;
    if newly_archived {
        append_system_message(chat_id, &system_text(CHAT_ARCHIVED), &mut *tx).await?;
    }

    tx.commit().await?;

    if newly_archived {
        info!(chat_id = %chat_id, requester = %requester, "Chat archived");
    }

    Ok(ArchiveOutcome {
        already_archived: !newly_archived,
    })
}
