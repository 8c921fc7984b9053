//! Membership guard.
//!
//! Pure functions over pre-fetched membership rows. Every mutating activity
//! resolves the caller's tier here before touching the database.

use serde::Serialize;

use super::errors::{ChatError, ChatResult};
use super::models::{ChatPermission, ChatType, Membership};
use crate::common::UserId;

/// Effective tier of a user in one chat. Variant order is rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    None,
    Guest,
    Admin,
    Owner,
}

impl From<ChatPermission> for Permission {
    fn from(p: ChatPermission) -> Self {
        match p {
            ChatPermission::Owner => Permission::Owner,
            ChatPermission::Admin => Permission::Admin,
            ChatPermission::Guest => Permission::Guest,
        }
    }
}

/// A membership that has been left resolves to `None`.
pub fn resolve_permission(memberships: &[Membership], user_id: UserId) -> Permission {
    memberships
        .iter()
        .find(|m| m.user_id == user_id && !m.has_left)
        .map(|m| Permission::from(m.permission))
        .unwrap_or(Permission::None)
}

pub fn require_at_least(permission: Permission, minimum: Permission) -> ChatResult<()> {
    if permission < minimum || permission == Permission::None {
        return Err(ChatError::forbidden(format!(
            "Requires {:?} permission or higher",
            minimum
        )));
    }
    Ok(())
}

/// Active membership check; non-members get NotFound so chat existence is
/// not leaked.
pub fn require_member(memberships: &[Membership], user_id: UserId) -> ChatResult<Permission> {
    match resolve_permission(memberships, user_id) {
        Permission::None => Err(ChatError::not_found("Chat not found or access denied")),
        permission => Ok(permission),
    }
}

/// OWNER/ADMIN may archive; in an emergency chat any active member may.
pub fn can_archive(chat_type: ChatType, permission: Permission) -> bool {
    match chat_type {
        ChatType::Emergency => permission >= Permission::Guest,
        ChatType::OneToOne | ChatType::Group => permission >= Permission::Admin,
    }
}
