pub mod capability;
pub mod chat;
pub mod enrollment;
pub mod membership;
pub mod message;
pub mod message_content;
pub mod message_event;
pub mod user;

pub use capability::ChatCapabilitySetting;
pub use chat::{private_pair_key, Chat, ChatStatus, ChatType, NewChat};
pub use enrollment::Enrollment;
pub use membership::{ChatPermission, Membership, Participant};
pub use message::{Message, MessageType, MessageWithContent, NewMessage};
pub use message_content::MessageContentVersion;
pub use message_event::{MessageEvent, MessageEventType, USER_RELEVANT_EVENTS};
pub use user::User;
