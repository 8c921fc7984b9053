use super::{AuthError, ChatCapability};
use crate::common::entity_ids::{ChatId, UserId};
use crate::kernel::BaseCapabilityService;

/// Entry point for capability checks
///
/// Usage:
/// ```ignore
/// Actor::new(user_id, is_admin)
///     .can(ChatCapability::SendMessages)
///     .in_chat(chat_id)
///     .check(deps)
///     .await?;
/// ```
pub struct Actor {
    user_id: UserId,
    is_admin: bool,
}

impl Actor {
    /// `is_admin` comes from verified JWT claims.
    pub fn new(user_id: UserId, is_admin: bool) -> Self {
        Self { user_id, is_admin }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn require_admin(&self) -> Result<(), AuthError> {
        if !self.is_admin {
            return Err(AuthError::AdminRequired);
        }
        Ok(())
    }

    /// Specify what capability the actor needs
    pub fn can(self, capability: ChatCapability) -> CapabilityBuilder {
        CapabilityBuilder {
            user_id: self.user_id,
            capability,
            chat_id: None,
        }
    }
}

/// Builder after specifying capability
pub struct CapabilityBuilder {
    user_id: UserId,
    capability: ChatCapability,
    chat_id: Option<ChatId>,
}

impl CapabilityBuilder {
    /// Also require the per-chat switch for this chat.
    pub fn in_chat(mut self, chat_id: ChatId) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    pub async fn check<D>(self, deps: &D) -> Result<(), AuthError>
    where
        D: HasAuthContext + ?Sized,
    {
        let service = deps.capability_service();

        if !service.global_enabled(self.capability).await? {
            tracing::debug!(user_id = %self.user_id, capability = ?self.capability, "Capability disabled globally");
            return Err(AuthError::CapabilityDisabled(format!("{:?}", self.capability)));
        }

        if let Some(chat_id) = self.chat_id {
            if !service.chat_enabled(chat_id, self.capability).await? {
                tracing::debug!(user_id = %self.user_id, chat_id = %chat_id, capability = ?self.capability, "Capability disabled for chat");
                return Err(AuthError::CapabilityDisabled(format!("{:?}", self.capability)));
            }
        }

        Ok(())
    }
}

/// Dependencies that can answer capability checks
pub trait HasAuthContext: Send + Sync {
    fn capability_service(&self) -> &dyn BaseCapabilityService;
}
