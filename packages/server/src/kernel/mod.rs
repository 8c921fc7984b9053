//! Kernel module - server infrastructure and dependencies.

pub mod capabilities;
pub mod deps;
pub mod notifications;
pub mod test_dependencies;
pub mod traits;

pub use capabilities::PostgresCapabilityService;
pub use deps::ServerDeps;
pub use notifications::{
    dispatch_in_background, LogNotificationDispatcher, WebhookNotificationDispatcher,
};
pub use test_dependencies::TestDependencies;
pub use traits::*;
