//! Read side: chat list, chat details and message pages.
//!
//! Statuses are derived per viewer from the event log at read time; nothing
//! here writes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::common::{
    trim_results, ChatCapability, ChatId, Cursor, MessageId, PageArgs, UserId, ValidatedPageArgs,
};
use crate::domains::chats::errors::{ChatError, ChatResult};
use crate::domains::chats::models::{
    Chat, ChatPermission, ChatStatus, ChatType, Membership, Message, MessageEvent, MessageType,
    MessageWithContent, Participant, User,
};
use crate::domains::chats::payloads::preview_text;
use crate::domains::chats::permissions::require_member;
use crate::domains::chats::status::{derive_status, group_by_message, DisplayStatus};
use crate::kernel::ServerDeps;

/// Messages shown when a chat is opened
const CHAT_DETAIL_MESSAGES: i32 = 25;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageItem {
    pub id: MessageId,
    pub created_at: DateTime<Utc>,
    pub payload: JsonValue,
    pub sender_id: Option<UserId>,
    pub status: DisplayStatus,
    pub message_type: MessageType,
    pub parent_id: Option<MessageId>,
    pub reply_count: i64,
    pub has_unread_replies: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub items: Vec<MessageItem>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePreview {
    pub id: MessageId,
    pub created_at: DateTime<Utc>,
    pub preview: String,
    pub sender_id: Option<UserId>,
    pub status: DisplayStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatListEntry {
    pub id: ChatId,
    pub name: Option<String>,
    pub chat_type: ChatType,
    pub status: ChatStatus,
    pub unread_count: i64,
    pub last_activity_at: DateTime<Utc>,
    pub last_message: Option<MessagePreview>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: UserId,
    pub name: String,
    pub permission: ChatPermission,
    pub is_online: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityFlag {
    pub capability: ChatCapability,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDetails {
    pub id: ChatId,
    pub name: Option<String>,
    pub chat_type: ChatType,
    pub status: ChatStatus,
    pub course_id: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub messages: Vec<MessageItem>,
    pub participants: Vec<ParticipantInfo>,
    pub capabilities: Vec<CapabilityFlag>,
}

/// Display name of a chat for one viewer: private chats are named after the
/// other participant.
pub fn resolve_chat_name(chat: &Chat, participants: &[Participant], viewer: UserId) -> Option<String> {
    match chat.chat_type {
        ChatType::OneToOne => participants
            .iter()
            .find(|p| p.user_id != viewer)
            .map(|p| p.name.clone())
            .or_else(|| chat.name.clone()),
        ChatType::Group | ChatType::Emergency => chat.name.clone(),
    }
}

/// Attach derived statuses to raw rows, keeping their order
async fn to_items(
    rows: Vec<MessageWithContent>,
    viewer: UserId,
    deps: &ServerDeps,
) -> ChatResult<Vec<MessageItem>> {
    let ids: Vec<MessageId> = rows.iter().map(|r| r.id).collect();
    let mut events = group_by_message(
        MessageEvent::find_relevant_for_messages(&ids, &deps.db_pool).await?,
    );

    Ok(rows
        .into_iter()
        .map(|row| {
            let message_events = events.remove(&row.id).unwrap_or_default();
            MessageItem {
                id: row.id,
                created_at: row.created_at,
                payload: row.payload.unwrap_or_else(|| JsonValue::Object(Default::default())),
                sender_id: row.sender_id,
                status: derive_status(&message_events, viewer, row.sender_id),
                message_type: row.message_type,
                parent_id: row.parent_id,
                reply_count: row.reply_count,
                has_unread_replies: row.has_unread_replies,
            }
        })
        .collect())
}

/// Fetch one page newest-first and return it oldest-first with the cursor
/// for the next (older) page.
async fn fetch_page(
    chat_id: ChatId,
    parent_id: Option<MessageId>,
    viewer: UserId,
    args: &ValidatedPageArgs,
    deps: &ServerDeps,
) -> ChatResult<(Vec<MessageItem>, Option<String>)> {
    let rows = Message::find_page(chat_id, parent_id, viewer, args, &deps.db_pool).await?;
    let (mut rows, has_more) = trim_results(rows, args.limit);

    let next_cursor = if has_more {
        rows.last().map(|oldest| Cursor::encode_uuid(oldest.id.into_uuid()))
    } else {
        None
    };

    rows.reverse();
    Ok((to_items(rows, viewer, deps).await?, next_cursor))
}

/// The chat, if the viewer is an active member of it
async fn load_for_member(chat_id: ChatId, viewer: UserId, deps: &ServerDeps) -> ChatResult<Chat> {
    let chat = Chat::find_by_id(chat_id, &deps.db_pool)
        .await?
        .ok_or_else(|| ChatError::not_found("Chat not found or access denied"))?;
    let memberships = Membership::find_for_chat(chat_id, &deps.db_pool).await?;
    require_member(&memberships, viewer)?;
    Ok(chat)
}

pub async fn list_messages(
    chat_id: ChatId,
    viewer: UserId,
    page: PageArgs,
    parent_id: Option<MessageId>,
    deps: &ServerDeps,
) -> ChatResult<MessagePage> {
    let args = page.validate().map_err(ChatError::bad_request)?;
    load_for_member(chat_id, viewer, deps).await?;

    let parent = match parent_id {
        Some(id) => Some(
            Message::find_with_content(id, viewer, &deps.db_pool)
                .await?
                .filter(|p| p.chat_id == chat_id)
                .ok_or_else(|| ChatError::not_found("Thread parent not found"))?,
        ),
        None => None,
    };

    let (mut items, next_cursor) = fetch_page(chat_id, parent_id, viewer, &args, deps).await?;

    // The thread root precedes every reply, so it belongs on the oldest page
    if let Some(parent) = parent {
        if next_cursor.is_none() && !items.iter().any(|i| i.id == parent.id) {
            let mut pinned = to_items(vec![parent], viewer, deps).await?;
            pinned.append(&mut items);
            items = pinned;
        }
    }

    Ok(MessagePage { items, next_cursor })
}

/// A single message with its derived status, for members of its chat
pub async fn get_message(
    message_id: MessageId,
    viewer: UserId,
    deps: &ServerDeps,
) -> ChatResult<MessageItem> {
    let row = Message::find_with_content(message_id, viewer, &deps.db_pool)
        .await?
        .ok_or_else(|| ChatError::not_found("Message not found"))?;
    load_for_member(row.chat_id, viewer, deps).await?;

    to_items(vec![row], viewer, deps)
        .await?
        .pop()
        .ok_or_else(|| ChatError::not_found("Message not found"))
}

pub async fn get_chat(chat_id: ChatId, viewer: UserId, deps: &ServerDeps) -> ChatResult<ChatDetails> {
    let chat = load_for_member(chat_id, viewer, deps).await?;

    let args = PageArgs {
        cursor: None,
        limit: Some(CHAT_DETAIL_MESSAGES),
    }
    .validate()
    .map_err(ChatError::bad_request)?;
    let (messages, _) = fetch_page(chat_id, None, viewer, &args, deps).await?;

    let participants = Participant::find_for_chat(chat_id, &deps.db_pool).await?;
    let name = resolve_chat_name(&chat, &participants, viewer);

    let now = Utc::now();
    let participants = participants
        .into_iter()
        .filter(|p| !p.has_left)
        .map(|p| ParticipantInfo {
            id: p.user_id,
            is_online: User::is_online_at(p.last_seen_at, now),
            name: p.name,
            permission: p.permission,
        })
        .collect();

    let mut capabilities = Vec::new();
    for capability in [
        ChatCapability::SendMessages,
        ChatCapability::UploadImages,
        ChatCapability::CreateThreads,
    ] {
        let enabled = deps.capabilities.global_enabled(capability).await?
            && deps.capabilities.chat_enabled(chat_id, capability).await?;
        capabilities.push(CapabilityFlag { capability, enabled });
    }

    Ok(ChatDetails {
        id: chat.id,
        name,
        chat_type: chat.chat_type,
        status: chat.status,
        course_id: chat.course_id,
        archived_at: chat.archived_at,
        messages,
        participants,
        capabilities,
    })
}

pub async fn list_chats(viewer: UserId, deps: &ServerDeps) -> ChatResult<Vec<ChatListEntry>> {
    let chats = Chat::find_active_for_user(viewer, &deps.db_pool).await?;
    if chats.is_empty() {
        return Ok(Vec::new());
    }

    let chat_ids: Vec<ChatId> = chats.iter().map(|c| c.id).collect();

    let unread: HashMap<ChatId, i64> = Message::count_unread_per_chat(&chat_ids, viewer, &deps.db_pool)
        .await?
        .into_iter()
        .collect();

    let latest = Message::find_latest_per_chat(&chat_ids, viewer, &deps.db_pool).await?;
    let latest_chat_ids: Vec<ChatId> = latest.iter().map(|row| row.chat_id).collect();
    let mut latest: HashMap<ChatId, MessageItem> = latest_chat_ids
        .into_iter()
        .zip(to_items(latest, viewer, deps).await?)
        .collect();

    let mut entries = Vec::with_capacity(chats.len());
    for chat in chats {
        let name = match chat.chat_type {
            ChatType::OneToOne => {
                let participants = Participant::find_for_chat(chat.id, &deps.db_pool).await?;
                resolve_chat_name(&chat, &participants, viewer)
            }
            ChatType::Group | ChatType::Emergency => chat.name.clone(),
        };

        entries.push(ChatListEntry {
            id: chat.id,
            name,
            chat_type: chat.chat_type,
            status: chat.status,
            unread_count: unread.get(&chat.id).copied().unwrap_or(0),
            last_activity_at: chat.last_activity_at,
            last_message: latest.remove(&chat.id).map(|item| MessagePreview {
                id: item.id,
                created_at: item.created_at,
                preview: preview_text(&item.payload),
                sender_id: item.sender_id,
                status: item.status,
            }),
        });
    }

    Ok(entries)
}
