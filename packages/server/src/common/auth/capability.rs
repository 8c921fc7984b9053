use serde::{Deserialize, Serialize};

/// Feature switches checked before a chat mutation.
///
/// `CreateChat` is a global switch only. The others combine a global flag
/// (where one exists) with a per-chat row in `chat_capabilities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatCapability {
    /// Start new conversations
    CreateChat,

    /// Post messages into a chat
    SendMessages,

    /// Post IMAGE messages
    UploadImages,

    /// Reply inside a thread (messages with a parent)
    CreateThreads,
}

impl ChatCapability {
    /// Key stored in `chat_capabilities.capability`, if the capability is per-chat.
    pub fn chat_key(&self) -> Option<&'static str> {
        match self {
            ChatCapability::CreateChat => None,
            ChatCapability::SendMessages => Some("SEND_MESSAGES"),
            ChatCapability::UploadImages => Some("PICTURE_UPLOAD"),
            ChatCapability::CreateThreads => Some("THREADS"),
        }
    }

    /// Value used when a chat has no row for this capability.
    pub fn chat_default(&self) -> bool {
        match self {
            ChatCapability::CreateChat => true,
            ChatCapability::SendMessages => true,
            ChatCapability::UploadImages => false,
            ChatCapability::CreateThreads => true,
        }
    }

    pub fn from_chat_key(key: &str) -> Option<Self> {
        match key {
            "SEND_MESSAGES" => Some(ChatCapability::SendMessages),
            "PICTURE_UPLOAD" => Some(ChatCapability::UploadImages),
            "THREADS" => Some(ChatCapability::CreateThreads),
            _ => None,
        }
    }
}
