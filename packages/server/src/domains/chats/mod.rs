//! Chats domain - conversations, the message ledger and the alert interview
//!
//! Architecture:
//! - models/: sqlx row types and queries
//! - activities/: business operations, one transaction each
//! - permissions / status / alerts / payloads: pure rules the activities share

pub mod activities;
pub mod alerts;
pub mod errors;
pub mod models;
pub mod payloads;
pub mod permissions;
pub mod status;

pub use activities::ChatUser;
pub use alerts::AlertSettings;
pub use errors::{ChatError, ChatResult};
pub use permissions::Permission;
pub use status::DisplayStatus;
