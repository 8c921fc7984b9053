use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use super::BaseCapabilityService;
use crate::common::{ChatCapability, ChatId};
use crate::domains::chats::models::ChatCapabilitySetting;

/// Global switches from config, per-chat switches from `chat_capabilities`
pub struct PostgresCapabilityService {
    pool: PgPool,
    chat_creation_enabled: bool,
    send_messages_enabled: bool,
}

impl PostgresCapabilityService {
    pub fn new(pool: PgPool, chat_creation_enabled: bool, send_messages_enabled: bool) -> Self {
        Self {
            pool,
            chat_creation_enabled,
            send_messages_enabled,
        }
    }
}

#[async_trait]
impl BaseCapabilityService for PostgresCapabilityService {
    async fn global_enabled(&self, capability: ChatCapability) -> Result<bool> {
        Ok(match capability {
            ChatCapability::CreateChat => self.chat_creation_enabled,
            ChatCapability::SendMessages => self.send_messages_enabled,
            ChatCapability::UploadImages | ChatCapability::CreateThreads => true,
        })
    }

    async fn chat_enabled(&self, chat_id: ChatId, capability: ChatCapability) -> Result<bool> {
        let Some(key) = capability.chat_key() else {
            return Ok(true);
        };

        let stored = ChatCapabilitySetting::find_flag(chat_id, key, &self.pool).await?;
        Ok(stored.unwrap_or_else(|| capability.chat_default()))
    }
}
