//! Guarded membership mutations: add, remove, rename

use serde::Serialize;
use tracing::info;

use super::{append_system_message, ChatUser};
use crate::common::{ChatId, UserId};
use crate::domains::chats::errors::{ChatError, ChatResult};
use crate::domains::chats::models::{
    Chat, ChatPermission, ChatType, Membership, User,
};
use crate::domains::chats::payloads::{left_the_group, system_text};
use crate::domains::chats::permissions::{require_at_least, require_member, Permission};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantsOutcome {
    pub added: Vec<UserId>,
    pub reactivated: Vec<UserId>,
    /// Already active members
    pub skipped: Vec<UserId>,
}

/// Lock the chat, load memberships and require OWNER/ADMIN.
async fn lock_as_manager(
    chat_id: ChatId,
    requester: UserId,
    conn: &mut sqlx::PgConnection,
) -> ChatResult<(Chat, Vec<Membership>)> {
    let chat = Chat::find_by_id_for_update(chat_id, &mut *conn)
        .await?
        .ok_or_else(|| ChatError::not_found("Chat not found or access denied"))?;

    let memberships = Membership::find_for_chat_in(chat_id, &mut *conn).await?;
    let permission = require_member(&memberships, requester)?;
    require_at_least(permission, Permission::Admin)?;

    if chat.is_archived() {
        return Err(ChatError::forbidden("Chat is archived"));
    }

    Ok((chat, memberships))
}

pub async fn remove_participant(
    chat_id: ChatId,
    requester: UserId,
    participant: UserId,
    deps: &ServerDeps,
) -> ChatResult<()> {
    let mut tx = deps.db_pool.begin().await?;
    let (chat, memberships) = lock_as_manager(chat_id, requester, &mut *tx).await?;

    if chat.chat_type == ChatType::OneToOne {
        return Err(ChatError::bad_request(
            "Participants cannot be removed from a private chat",
        ));
    }

    let target = memberships
        .iter()
        .find(|m| m.user_id == participant)
        .ok_or_else(|| ChatError::not_found("Participant is not a member of this chat"))?;
    if target.permission == ChatPermission::Owner {
        return Err(ChatError::forbidden("The owner cannot be removed"));
    }

    let name = User::find_by_id_in(participant, &mut *tx)
        .await?
        .map(|u| u.name)
        .unwrap_or_else(|| participant.to_string());

    Membership::delete(chat_id, participant, &mut *tx).await?;
    append_system_message(chat_id, &system_text(left_the_group(&name)), &mut *tx).await?;
    Chat::touch_activity(chat_id, &mut *tx).await?;

    tx.commit().await?;

    info!(chat_id = %chat_id, removed = %participant, by = %requester, "Participant removed");
    Ok(())
}

pub async fn add_participants(
    chat_id: ChatId,
    requester: UserId,
    user_ids: Vec<UserId>,
    deps: &ServerDeps,
) -> ChatResult<AddParticipantsOutcome> {
    if user_ids.is_empty() {
        return Err(ChatError::bad_request("No participants given"));
    }

    let missing = User::find_missing(&user_ids, &deps.db_pool).await?;
    if !missing.is_empty() {
        return Err(ChatError::not_found(format!(
            "Unknown users: {}",
            missing
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let mut tx = deps.db_pool.begin().await?;
    let (chat, memberships) = lock_as_manager(chat_id, requester, &mut *tx).await?;

    if chat.chat_type == ChatType::OneToOne {
        return Err(ChatError::bad_request(
            "Participants cannot be added to a private chat",
        ));
    }

    let mut outcome = AddParticipantsOutcome::default();
    for user_id in user_ids {
        if outcome.added.contains(&user_id)
            || outcome.reactivated.contains(&user_id)
            || outcome.skipped.contains(&user_id)
        {
            continue;
        }

        match memberships.iter().find(|m| m.user_id == user_id) {
            Some(m) if !m.has_left => outcome.skipped.push(user_id),
            Some(_) => {
                Membership::set_permission(chat_id, user_id, ChatPermission::Guest, &mut *tx)
                    .await?;
                outcome.reactivated.push(user_id);
            }
            None => {
                Membership::insert(chat_id, user_id, ChatPermission::Guest, &mut *tx).await?;
                outcome.added.push(user_id);
            }
        }
    }

    if !outcome.added.is_empty() || !outcome.reactivated.is_empty() {
        Chat::touch_activity(chat_id, &mut *tx).await?;
    }
    tx.commit().await?;

    info!(
        chat_id = %chat_id,
        added = outcome.added.len(),
        reactivated = outcome.reactivated.len(),
        skipped = outcome.skipped.len(),
        "Participants added"
    );
    Ok(outcome)
}

pub async fn rename_chat(
    chat_id: ChatId,
    requester: &ChatUser,
    name: &str,
    deps: &ServerDeps,
) -> ChatResult<Chat> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatError::bad_request("Chat name must not be blank"));
    }

    let mut tx = deps.db_pool.begin().await?;
    let (chat, _) = lock_as_manager(chat_id, requester.id, &mut *tx).await?;

    if chat.chat_type == ChatType::OneToOne {
        return Err(ChatError::bad_request("Private chats cannot be named"));
    }

    let renamed = Chat::rename(chat_id, name, &mut *tx).await?;
    tx.commit().await?;

    info!(chat_id = %chat_id, by = %requester.id, "Chat renamed");
    Ok(renamed)
}
