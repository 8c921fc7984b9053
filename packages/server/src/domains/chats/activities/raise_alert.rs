//! Raise alert - open an emergency chat and start the alert interview

use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{append_message, ChatUser};
use crate::common::{ChatCapability, ChatId};
use crate::domains::chats::alerts::{emergency_chat_name, question_payload};
use crate::domains::chats::errors::{ChatError, ChatResult};
use crate::domains::chats::models::{
    Chat, ChatCapabilitySetting, ChatPermission, ChatType, Membership, MessageType, NewChat, User,
};
use crate::domains::chats::payloads::{location_payload, SYSTEM_MSG_TYPE_EMERGENCY_ALERT};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AlertLocation {
    pub latitude: f64,
    pub longitude: f64,
}

pub async fn raise_alert(
    user: &ChatUser,
    location: Option<AlertLocation>,
    locale: &str,
    deps: &ServerDeps,
) -> ChatResult<ChatId> {
    if let Some(loc) = &location {
        let in_range = (-90.0..=90.0).contains(&loc.latitude)
            && (-180.0..=180.0).contains(&loc.longitude);
        if !in_range {
            return Err(ChatError::bad_request("Location is out of range"));
        }
    }

    let script = deps
        .alert_settings
        .script(locale)
        .ok_or_else(|| ChatError::Internal(anyhow::anyhow!("No alert script configured")))?;

    // The caller may not have a user row yet
    User::upsert_seen(user.id, &user.name, &deps.db_pool).await?;

    let mut tx = deps.db_pool.begin().await?;

    let chat = Chat::insert(
        NewChat {
            name: Some(emergency_chat_name(locale, &user.name)),
            chat_type: ChatType::Emergency,
            course_id: None,
            private_pair_key: None,
        },
        &mut *tx,
    )
    .await?;
    Membership::insert(chat.id, user.id, ChatPermission::Owner, &mut *tx).await?;

    if let Some(key) = ChatCapability::SendMessages.chat_key() {
        ChatCapabilitySetting::set(chat.id, key, true, &mut *tx).await?;
    }

    // Explicit timestamps keep alert, location and question in this order
    let base = Utc::now();

    append_message(
        chat.id,
        None,
        MessageType::System,
        None,
        &json!({
            "system_msg_type": SYSTEM_MSG_TYPE_EMERGENCY_ALERT,
            "userId": user.id,
            "userName": user.name,
        }),
        Some(base),
        &mut *tx,
    )
    .await?;

    if let Some(loc) = location {
        append_message(
            chat.id,
            None,
            MessageType::Location,
            None,
            &location_payload(loc.latitude, loc.longitude),
            Some(base + Duration::milliseconds(100)),
            &mut *tx,
        )
        .await?;
    }

    match script.first_question() {
        Some(question) => {
            append_message(
                chat.id,
                None,
                MessageType::AlertQuestion,
                None,
                &question_payload(question),
                Some(base + Duration::milliseconds(200)),
                &mut *tx,
            )
            .await?;
        }
        None => warn!(locale = %locale, "Alert script has no questions"),
    }

    tx.commit().await?;

    info!(
        chat_id = %chat.id,
        user_id = %user.id,
        has_location = location.is_some(),
        "Emergency alert raised"
    );
    Ok(chat.id)
}
