//! Read / delivery receipts

use serde::Serialize;
use tracing::debug;

use crate::common::{MessageId, UserId};
use crate::domains::chats::errors::{ChatError, ChatResult};
use crate::domains::chats::models::{Membership, Message, MessageEvent, MessageEventType};
use crate::domains::chats::permissions::require_member;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkOutcome {
    Recorded,
    /// Receipts on your own message carry no information and are dropped
    OwnMessage,
}

async fn record(
    message_id: MessageId,
    viewer: UserId,
    event_type: MessageEventType,
    deps: &ServerDeps,
) -> ChatResult<MarkOutcome> {
    let message = Message::find_by_id(message_id, &deps.db_pool)
        .await?
        .ok_or_else(|| ChatError::not_found("Message not found"))?;

    let memberships = Membership::find_for_chat(message.chat_id, &deps.db_pool).await?;
    require_member(&memberships, viewer)?;

    if message.sender_id == Some(viewer) {
        return Ok(MarkOutcome::OwnMessage);
    }

    // Not deduplicated; READ is terminal in status derivation
    let mut conn = deps.db_pool.acquire().await?;
    MessageEvent::append(message_id, event_type, Some(viewer), &mut *conn).await?;

    debug!(message_id = %message_id, viewer = %viewer, event = ?event_type, "Receipt recorded");
    Ok(MarkOutcome::Recorded)
}

pub async fn mark_read(
    message_id: MessageId,
    viewer: UserId,
    deps: &ServerDeps,
) -> ChatResult<MarkOutcome> {
    record(message_id, viewer, MessageEventType::Read, deps).await
}

pub async fn mark_delivered(
    message_id: MessageId,
    viewer: UserId,
    deps: &ServerDeps,
) -> ChatResult<MarkOutcome> {
    record(message_id, viewer, MessageEventType::Delivered, deps).await
}
