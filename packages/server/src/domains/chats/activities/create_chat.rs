//! Create chat activity - validation, private-chat dedup, insert

use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{append_system_message, ChatUser};
use crate::common::{Actor, ChatCapability, ChatId, UserId};
use crate::domains::chats::errors::{is_unique_violation, ChatError, ChatResult};
use crate::domains::chats::models::{
    private_pair_key, Chat, ChatPermission, ChatType, Membership, NewChat, User,
};
use crate::domains::chats::payloads::{system_text, NEW_CHAT_CREATED};
use crate::kernel::ServerDeps;

/// What kind of chat a creation request describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatShape {
    /// Exactly one other member, no name
    Private(UserId),
    /// Two or more other members with a trimmed, non-empty name
    Group(String),
}

pub fn validate_new_chat(
    requester: UserId,
    member_ids: &[UserId],
    name: Option<&str>,
) -> ChatResult<ChatShape> {
    if member_ids.is_empty() {
        return Err(ChatError::bad_request(
            "A chat must have at least one member besides the creator.",
        ));
    }

    if member_ids.contains(&requester) {
        return Err(ChatError::bad_request(
            "The creator must not be listed as a member.",
        ));
    }

    let unique: HashSet<&UserId> = member_ids.iter().collect();
    if unique.len() != member_ids.len() {
        return Err(ChatError::bad_request("Duplicate members are not allowed."));
    }

    let name = name.map(str::trim).filter(|n| !n.is_empty());

    match (member_ids, name) {
        ([other], None) => Ok(ChatShape::Private(*other)),
        ([_], Some(_)) => Err(ChatError::bad_request(
            "Private chats cannot have a name.",
        )),
        (_, Some(name)) => Ok(ChatShape::Group(name.to_string())),
        (_, None) => Err(ChatError::bad_request("Group chats require a name.")),
    }
}

/// Create a chat, or return the existing private chat for this pair.
///
/// `include_archived` widens private-chat dedup to archived chats. It is only
/// honoured for admins.
pub async fn create_chat(
    requester: &ChatUser,
    member_ids: Vec<UserId>,
    name: Option<String>,
    include_archived: bool,
    deps: &ServerDeps,
) -> ChatResult<ChatId> {
    let shape = validate_new_chat(requester.id, &member_ids, name.as_deref())?;

    let missing = User::find_missing(&member_ids, &deps.db_pool).await?;
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

    let pair_key = match &shape {
        ChatShape::Private(other) => Some(private_pair_key(requester.id, *other)),
        ChatShape::Group(_) => None,
    };

    if let Some(key) = &pair_key {
        let include_archived = include_archived && requester.is_admin;
        if let Some(existing) = Chat::find_private(key, include_archived, &deps.db_pool).await? {
            debug!(chat_id = %existing.id, "Found existing private chat");
            return Ok(existing.id);
        }
    }

    Actor::new(requester.id, requester.is_admin)
        .can(ChatCapability::CreateChat)
        .check(deps)
        .await?;

    let new_chat = match shape {
        ChatShape::Private(_) => NewChat {
            name: None,
            chat_type: ChatType::OneToOne,
            course_id: None,
            private_pair_key: pair_key.clone(),
        },
        ChatShape::Group(name) => NewChat {
            name: Some(name),
            chat_type: ChatType::Group,
            course_id: None,
            private_pair_key: None,
        },
    };

    match insert_chat(requester.id, &member_ids, new_chat, deps).await {
        Ok(chat_id) => {
            info!(chat_id = %chat_id, creator = %requester.id, members = member_ids.len(), "Chat created");
            Ok(chat_id)
        }
        Err(e) if is_unique_violation(&e) => {
            // Lost the race for this pair; the transaction has rolled back
            let key = pair_key.ok_or_else(|| ChatError::Internal(e))?;
            warn!(pair_key = %key, "Concurrent private chat creation, returning winner");
            Chat::find_private(&key, false, &deps.db_pool)
                .await?
                .map(|winner| winner.id)
                .ok_or_else(|| ChatError::conflict("Private chat was created concurrently"))
        }
        Err(e) => Err(e.into()),
    }
}

async fn insert_chat(
    creator: UserId,
    member_ids: &[UserId],
    new_chat: NewChat,
    deps: &ServerDeps,
) -> anyhow::Result<ChatId> {
    let mut tx = deps.db_pool.begin().await?;

    let chat = Chat::insert(new_chat, &mut *tx).await?;
    Membership::insert(chat.id, creator, ChatPermission::Owner, &mut *tx).await?;
    for member in member_ids {
        Membership::insert(chat.id, *member, ChatPermission::Guest, &mut *tx).await?;
    }
    append_system_message(chat.id, &system_text(NEW_CHAT_CREATED), &mut *tx).await?;

    tx.commit().await?;
    Ok(chat.id)
}
