// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Chat rules live in domains/chats and call through these traits.
//
// Naming convention: Base* for trait names

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::{ChatCapability, ChatId, MessageId, UserId};

// =============================================================================
// Notification Dispatcher (Infrastructure - push transport lives elsewhere)
// =============================================================================

/// One "you have a new message" request for one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub recipient_id: UserId,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub preview: String,
}

#[async_trait]
pub trait BaseNotificationDispatcher: Send + Sync {
    /// Hand a notification to the push transport
    ///
    /// Called after the message is committed. Errors are logged by the caller
    /// and never affect the message itself.
    async fn deliver(&self, request: NotificationRequest) -> Result<()>;
}

// =============================================================================
// Capability Service (Infrastructure - feature switches)
// =============================================================================

#[async_trait]
pub trait BaseCapabilityService: Send + Sync {
    /// Deployment-wide switch for a capability
    async fn global_enabled(&self, capability: ChatCapability) -> Result<bool>;

    /// Per-chat switch, falling back to the capability's default
    async fn chat_enabled(&self, chat_id: ChatId, capability: ChatCapability) -> Result<bool>;
}
