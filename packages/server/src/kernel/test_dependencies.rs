// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{BaseCapabilityService, BaseNotificationDispatcher, NotificationRequest, ServerDeps};
use crate::common::{ChatCapability, ChatId};
use crate::domains::auth::JwtService;
use crate::domains::chats::alerts::AlertSettings;

// =============================================================================
// Mock Notification Dispatcher
// =============================================================================

#[derive(Default)]
pub struct MockNotificationDispatcher {
    delivered: Arc<Mutex<Vec<NotificationRequest>>>,
}

impl MockNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests handed to the dispatcher so far
    pub fn delivered(&self) -> Vec<NotificationRequest> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn was_delivered_to(&self, recipient: crate::common::UserId) -> bool {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.recipient_id == recipient)
    }

    /// Dispatch runs on a spawned task; poll until `count` requests arrived
    /// (or about two seconds passed).
    pub async fn wait_for(&self, count: usize) {
        for _ in 0..200 {
            if self.delivered.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl BaseNotificationDispatcher for MockNotificationDispatcher {
    async fn deliver(&self, request: NotificationRequest) -> Result<()> {
        self.delivered.lock().unwrap().push(request);
        Ok(())
    }
}

/// Always fails, counting attempts
#[derive(Default)]
pub struct FailingNotificationDispatcher {
    attempts: AtomicUsize,
}

impl FailingNotificationDispatcher {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn wait_for_attempts(&self, count: usize) {
        for _ in 0..200 {
            if self.attempts() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl BaseNotificationDispatcher for FailingNotificationDispatcher {
    async fn deliver(&self, _request: NotificationRequest) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("push transport unavailable")
    }
}

// =============================================================================
// Static Capability Service
// =============================================================================

/// In-memory capability switches; unset entries use the capability defaults
#[derive(Default, Clone)]
pub struct StaticCapabilityService {
    global: HashMap<ChatCapability, bool>,
    per_chat: HashMap<(ChatId, ChatCapability), bool>,
}

impl StaticCapabilityService {
    pub fn with_global(mut self, capability: ChatCapability, enabled: bool) -> Self {
        self.global.insert(capability, enabled);
        self
    }

    pub fn with_chat(mut self, chat_id: ChatId, capability: ChatCapability, enabled: bool) -> Self {
        self.per_chat.insert((chat_id, capability), enabled);
        self
    }
}

#[async_trait]
impl BaseCapabilityService for StaticCapabilityService {
    async fn global_enabled(&self, capability: ChatCapability) -> Result<bool> {
        Ok(self.global.get(&capability).copied().unwrap_or(true))
    }

    async fn chat_enabled(&self, chat_id: ChatId, capability: ChatCapability) -> Result<bool> {
        Ok(self
            .per_chat
            .get(&(chat_id, capability))
            .copied()
            .unwrap_or_else(|| capability.chat_default()))
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_JWT_ISSUER: &str = "chat-core";

#[derive(Clone)]
pub struct TestDependencies {
    pub notifier: Arc<MockNotificationDispatcher>,
    /// Takes the place of `notifier` when set
    pub dispatcher: Option<Arc<dyn BaseNotificationDispatcher>>,
    pub capabilities: Option<Arc<dyn BaseCapabilityService>>,
    pub alert_settings: AlertSettings,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            notifier: Arc::new(MockNotificationDispatcher::new()),
            dispatcher: None,
            capabilities: None,
            alert_settings: AlertSettings::builtin(),
        }
    }

    /// Replace the Postgres-backed capability service
    pub fn mock_capabilities(mut self, service: StaticCapabilityService) -> Self {
        self.capabilities = Some(Arc::new(service));
        self
    }

    pub fn notification_dispatcher(mut self, dispatcher: Arc<dyn BaseNotificationDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn alert_settings(mut self, settings: AlertSettings) -> Self {
        self.alert_settings = settings;
        self
    }

    /// Convert into ServerDeps for testing
    pub fn into_deps(self, db_pool: PgPool) -> ServerDeps {
        let capabilities = self.capabilities.unwrap_or_else(|| {
            Arc::new(super::PostgresCapabilityService::new(
                db_pool.clone(),
                true,
                true,
            ))
        });

        let notifier = self
            .dispatcher
            .unwrap_or_else(|| self.notifier as Arc<dyn BaseNotificationDispatcher>);

        ServerDeps::new(
            db_pool,
            notifier,
            capabilities,
            Arc::new(self.alert_settings),
            Arc::new(JwtService::new(TEST_JWT_SECRET, TEST_JWT_ISSUER.to_string())),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
