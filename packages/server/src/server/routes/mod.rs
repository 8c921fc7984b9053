// HTTP routes
pub mod chats;
pub mod health;
pub mod internal;

pub use chats::*;
pub use health::*;
pub use internal::*;
