//! Post message activity - append a client message to the ledger

use tracing::info;
use typed_builder::TypedBuilder;

use super::{append_message, ChatUser};
use crate::common::{Actor, ChatCapability, ChatId, MessageId};
use crate::domains::chats::errors::{ChatError, ChatResult};
use crate::domains::chats::models::{Chat, Membership, Message, MessageContentVersion, MessageType};
use crate::domains::chats::payloads::{
    image_payload, plain_text, preview_text, quoted_snippet, text_payload, MAX_TEXT_CHARS,
};
use crate::domains::chats::permissions::require_member;
use crate::kernel::{dispatch_in_background, NotificationRequest, ServerDeps};

#[derive(Debug, Clone, TypedBuilder)]
pub struct NewMessageInput {
    #[builder(default = MessageType::Text)]
    pub message_type: MessageType,
    /// Text for TEXT messages, the uploaded URL for IMAGE messages
    #[builder(setter(into))]
    pub content: String,
    #[builder(default, setter(strip_option))]
    pub parent_id: Option<MessageId>,
    #[builder(default, setter(strip_option))]
    pub quoted_message_id: Option<MessageId>,
}

fn validate_content(content: &str) -> ChatResult<()> {
    if content.trim().is_empty() {
        return Err(ChatError::bad_request("Message content must not be empty"));
    }
    if content.chars().count() > MAX_TEXT_CHARS {
        return Err(ChatError::bad_request(format!(
            "Message content must be at most {} characters",
            MAX_TEXT_CHARS
        )));
    }
    Ok(())
}

pub async fn post_message(
    chat_id: ChatId,
    sender: &ChatUser,
    input: NewMessageInput,
    deps: &ServerDeps,
) -> ChatResult<MessageId> {
    let chat = Chat::find_by_id(chat_id, &deps.db_pool)
        .await?
        .ok_or_else(|| ChatError::not_found("Chat not found or access denied"))?;

    let memberships = Membership::find_for_chat(chat_id, &deps.db_pool).await?;
    require_member(&memberships, sender.id)?;

    if chat.is_archived() {
        return Err(ChatError::forbidden("Chat is archived"));
    }

    if !input.message_type.is_client_postable() {
        return Err(ChatError::bad_request(format!(
            "{:?} messages cannot be posted by clients",
            input.message_type
        )));
    }
    validate_content(&input.content)?;

    let actor = || Actor::new(sender.id, sender.is_admin);
    actor()
        .can(ChatCapability::SendMessages)
        .in_chat(chat_id)
        .check(deps)
        .await?;
    if input.message_type == MessageType::Image {
        actor()
            .can(ChatCapability::UploadImages)
            .in_chat(chat_id)
            .check(deps)
            .await?;
    }
    if input.parent_id.is_some() {
        actor()
            .can(ChatCapability::CreateThreads)
            .in_chat(chat_id)
            .check(deps)
            .await?;
    }

    if let Some(parent_id) = input.parent_id {
        let parent = Message::find_by_id(parent_id, &deps.db_pool)
            .await?
            .filter(|p| p.chat_id == chat_id)
            .ok_or_else(|| ChatError::bad_request("Thread parent is not in this chat"))?;
        if parent.parent_id.is_some() {
            return Err(ChatError::bad_request("Replies cannot have replies"));
        }
    }

    let payload = match input.message_type {
        MessageType::Image => image_payload(input.content.trim()),
        _ => {
            let snippet = match input.quoted_message_id {
                Some(quoted_id) => Some(quote(chat_id, quoted_id, deps).await?),
                None => None,
            };
            text_payload(
                &input.content,
                input.quoted_message_id.map(|id| id.to_string()),
                snippet,
            )
        }
    };

    let mut tx = deps.db_pool.begin().await?;

    // Archiving or leaving may have landed since the checks above
    let locked = Chat::find_by_id_for_update(chat_id, &mut *tx)
        .await?
        .ok_or_else(|| ChatError::not_found("Chat not found or access denied"))?;
    if locked.is_archived() {
        return Err(ChatError::forbidden("Chat is archived"));
    }
    let memberships = Membership::find_for_chat_in(chat_id, &mut *tx).await?;
    require_member(&memberships, sender.id)?;

    let message = append_message(
        chat_id,
        Some(sender.id),
        input.message_type,
        input.parent_id,
        &payload,
        None,
        &mut *tx,
    )
    .await?;
    Chat::touch_activity(chat_id, &mut *tx).await?;
    tx.commit().await?;

    info!(
        chat_id = %chat_id,
        message_id = %message.id,
        sender_id = %sender.id,
        message_type = ?message.message_type,
        "Message posted"
    );

    let preview = preview_text(&payload);
    let requests = memberships
        .iter()
        .filter(|m| !m.has_left && m.user_id != sender.id)
        .map(|m| NotificationRequest {
            recipient_id: m.user_id,
            chat_id,
            message_id: message.id,
            preview: preview.clone(),
        })
        .collect();
    dispatch_in_background(deps.notifier.clone(), requests);

    Ok(message.id)
}

async fn quote(chat_id: ChatId, quoted_id: MessageId, deps: &ServerDeps) -> ChatResult<String> {
    let quoted = Message::find_by_id(quoted_id, &deps.db_pool)
        .await?
        .filter(|m| m.chat_id == chat_id)
        .ok_or_else(|| ChatError::bad_request("Quoted message is not in this chat"))?;

    let payload = MessageContentVersion::find_latest_payload(quoted.id, &deps.db_pool)
        .await?
        .unwrap_or_default();
    let text = plain_text(&payload)
        .map(str::to_string)
        .unwrap_or_else(|| preview_text(&payload));
    Ok(quoted_snippet(&text))
}
