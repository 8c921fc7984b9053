//! Typed ids for the chat entities.

pub use super::id::Id;

/// Marker type for users (chat participants).
pub struct User;

/// Marker type for chats.
pub struct Chat;

/// Marker type for messages.
pub struct Message;

/// Marker type for message events.
pub struct MessageEvent;

pub type UserId = Id<User>;
pub type ChatId = Id<Chat>;
pub type MessageId = Id<Message>;
pub type MessageEventId = Id<MessageEvent>;
