//! Chat activities - business logic functions
//!
//! Every mutation resolves the caller's membership tier first, then runs in a
//! single transaction. Notifications go out after commit.

mod archive_chat;
mod create_chat;
mod message_status;
mod participants;
mod post_message;
mod queries;
mod raise_alert;
mod reconcile_organisers;
mod update_message_content;

pub use archive_chat::{archive_chat, ArchiveOutcome};
pub use create_chat::{create_chat, validate_new_chat, ChatShape};
pub use message_status::{mark_delivered, mark_read, MarkOutcome};
pub use participants::{add_participants, remove_participant, rename_chat, AddParticipantsOutcome};
pub use post_message::{post_message, NewMessageInput};
pub use queries::{
    get_chat, get_message, list_chats, list_messages, resolve_chat_name, CapabilityFlag, ChatDetails, ChatListEntry,
    MessageItem, MessagePage, MessagePreview, ParticipantInfo,
};
pub use raise_alert::{raise_alert, AlertLocation};
pub use reconcile_organisers::{reconcile_organisers, ReconcileReport};
pub use update_message_content::{update_message_content, RevisionOutcome};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgConnection;

use super::models::{
    Message, MessageContentVersion, MessageEvent, MessageEventType, MessageType, NewMessage,
};
use crate::common::{ChatId, MessageId, UserId};

/// The authenticated caller, as carried by the bearer token
#[derive(Debug, Clone)]
pub struct ChatUser {
    pub id: UserId,
    pub name: String,
    pub is_admin: bool,
}

impl ChatUser {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_admin: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Insert a message with revision 0 and its CREATED + STORED events.
///
/// CREATED is attributed to the sender, STORED to the system.
pub(crate) async fn append_message(
    chat_id: ChatId,
    sender_id: Option<UserId>,
    message_type: MessageType,
    parent_id: Option<MessageId>,
    payload: &JsonValue,
    created_at: Option<DateTime<Utc>>,
    conn: &mut PgConnection,
) -> Result<Message> {
    let message = Message::insert(
        NewMessage {
            chat_id,
            sender_id,
            message_type,
            parent_id,
            created_at,
        },
        &mut *conn,
    )
    .await?;

    MessageContentVersion::insert(message.id, 0, payload, &mut *conn).await?;
    MessageEvent::append(message.id, MessageEventType::Created, sender_id, &mut *conn).await?;
    MessageEvent::append(message.id, MessageEventType::Stored, None, &mut *conn).await?;

    Ok(message)
}

/// System-authored SYSTEM message
pub(crate) async fn append_system_message(
    chat_id: ChatId,
    payload: &JsonValue,
    conn: &mut PgConnection,
) -> Result<Message> {
    append_message(chat_id, None, MessageType::System, None, payload, None, conn).await
}
