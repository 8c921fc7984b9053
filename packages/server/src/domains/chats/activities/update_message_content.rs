//! Update message content - append a revision, and drive the alert interview
//! when the message is an alert question.

use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgConnection;
use tracing::info;

use super::{append_message, ChatUser};
use crate::common::MessageId;
use crate::domains::chats::alerts::{
    answered_payload, is_answered, question_payload, AlertAnswer, NextStep,
};
use crate::domains::chats::errors::{is_unique_violation, ChatError, ChatResult};
use crate::domains::chats::models::{
    Chat, Membership, Message, MessageContentVersion, MessageType,
};
use crate::domains::chats::permissions::require_member;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionOutcome {
    pub message_id: MessageId,
    pub revision: i32,
    /// Next question or closing response written by an alert answer
    pub follow_up_message_id: Option<MessageId>,
    pub follow_up_type: Option<MessageType>,
}

async fn insert_revision(
    message_id: MessageId,
    revision: i32,
    payload: &JsonValue,
    conn: &mut PgConnection,
) -> ChatResult<()> {
    MessageContentVersion::insert(message_id, revision, payload, conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ChatError::conflict("Message was revised concurrently")
            } else {
                ChatError::Internal(e)
            }
        })?;
    Ok(())
}

/// `locale` selects the alert script when the message is an alert question.
pub async fn update_message_content(
    message_id: MessageId,
    editor: &ChatUser,
    payload: JsonValue,
    locale: &str,
    deps: &ServerDeps,
) -> ChatResult<RevisionOutcome> {
    let mut tx = deps.db_pool.begin().await?;

    // Row lock serialises concurrent answers to the same question
    let message = Message::find_by_id_for_update(message_id, &mut *tx)
        .await?
        .ok_or_else(|| ChatError::not_found("Message not found"))?;

    let memberships = Membership::find_for_chat_in(message.chat_id, &mut *tx).await?;
    require_member(&memberships, editor.id)?;

    let chat = Chat::find_by_id_for_update(message.chat_id, &mut *tx)
        .await?
        .ok_or_else(|| ChatError::not_found("Chat not found"))?;
    if chat.is_archived() {
        return Err(ChatError::forbidden("Chat is archived"));
    }

    let current = MessageContentVersion::find_latest(message_id, &mut *tx).await?;
    let next_revision = current.as_ref().map(|v| v.revision + 1).unwrap_or(0);

    if message.message_type != MessageType::AlertQuestion {
        if message.sender_id != Some(editor.id) {
            return Err(ChatError::forbidden("You can only update your own messages"));
        }

        insert_revision(message_id, next_revision, &payload, &mut *tx).await?;
        tx.commit().await?;

        info!(message_id = %message_id, revision = next_revision, "Message revised");
        return Ok(RevisionOutcome {
            message_id,
            revision: next_revision,
            follow_up_message_id: None,
            follow_up_type: None,
        });
    }

    // Alert question: the asker cannot answer their own question
    if message.sender_id == Some(editor.id) {
        return Err(ChatError::forbidden(
            "Only the addressed recipient may answer this question",
        ));
    }

    let current_payload = current.map(|v| v.payload).unwrap_or(JsonValue::Null);
    if is_answered(&current_payload) {
        return Err(ChatError::conflict("Question has already been answered"));
    }

    let answer = AlertAnswer::from_payload(&payload)?.bound_to(&current_payload)?;
    let script = deps
        .alert_settings
        .script(locale)
        .ok_or_else(|| ChatError::Internal(anyhow::anyhow!("No alert script configured")))?;

    let answered = answered_payload(&current_payload, &answer, script.selected_label(&answer));
    insert_revision(message_id, next_revision, &answered, &mut *tx).await?;

    let follow_up = match script.next_step(&answer) {
        NextStep::Ask(question) => {
            append_message(
                message.chat_id,
                message.sender_id,
                MessageType::AlertQuestion,
                None,
                &question_payload(question),
                None,
                &mut *tx,
            )
            .await?
        }
        NextStep::Finish => {
            append_message(
                message.chat_id,
                None,
                MessageType::AlertResponse,
                None,
                &script.response_payload(),
                None,
                &mut *tx,
            )
            .await?
        }
    };
    Chat::touch_activity(message.chat_id, &mut *tx).await?;

    tx.commit().await?;

    info!(
        chat_id = %message.chat_id,
        question_id = %message_id,
        question_ref = %answer.question_ref_id,
        follow_up = ?follow_up.message_type,
        "Alert question answered"
    );

    Ok(RevisionOutcome {
        message_id,
        revision: next_revision,
        follow_up_message_id: Some(follow_up.id),
        follow_up_type: Some(follow_up.message_type),
    })
}
