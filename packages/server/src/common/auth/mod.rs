/// Capability gate for chat operations
///
/// Provides a fluent API for feature checks in activity code:
///
/// ```ignore
/// use crate::common::auth::{Actor, ChatCapability};
///
/// Actor::new(user_id, is_admin)
///     .can(ChatCapability::SendMessages)
///     .in_chat(chat_id)
///     .check(deps)
///     .await?;
/// ```
///
/// Membership tiers are a separate concern, see `domains::chats::permissions`.

mod builder;
mod capability;
mod errors;

pub use builder::{Actor, CapabilityBuilder, HasAuthContext};
pub use capability::ChatCapability;
pub use errors::AuthError;
