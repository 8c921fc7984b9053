//! Server dependencies for activities (using traits for testability)
//!
//! This module provides the central dependency container used by all chat
//! activities. External services sit behind trait objects so tests can swap
//! them for mocks.

use sqlx::PgPool;
use std::sync::Arc;

use crate::common::auth::HasAuthContext;
use crate::domains::auth::JwtService;
use crate::domains::chats::alerts::AlertSettings;
use crate::kernel::{BaseCapabilityService, BaseNotificationDispatcher};

/// Server dependencies accessible to activities
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub notifier: Arc<dyn BaseNotificationDispatcher>,
    pub capabilities: Arc<dyn BaseCapabilityService>,
    /// Alert interview questions, per locale
    pub alert_settings: Arc<AlertSettings>,
    /// JWT service for token verification
    pub jwt_service: Arc<JwtService>,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        notifier: Arc<dyn BaseNotificationDispatcher>,
        capabilities: Arc<dyn BaseCapabilityService>,
        alert_settings: Arc<AlertSettings>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            db_pool,
            notifier,
            capabilities,
            alert_settings,
            jwt_service,
        }
    }
}

impl HasAuthContext for ServerDeps {
    fn capability_service(&self) -> &dyn BaseCapabilityService {
        self.capabilities.as_ref()
    }
}
