//! Test harness with testcontainers for integration testing.
//!
//! Uses one shared Postgres container across all tests. The container and
//! migrations are initialized on the first test, then reused. Tests isolate
//! themselves by creating fresh users and chats.

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chat_core::common::UserId;
use chat_core::domains::auth::JwtService;
use chat_core::kernel::test_dependencies::{
    MockNotificationDispatcher, TEST_JWT_ISSUER, TEST_JWT_SECRET,
};
use chat_core::kernel::{ServerDeps, TestDependencies};
use chat_core::server::{build_app, AppSettings};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::sync::Arc;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use tower::ServiceExt;

pub const TEST_INTERNAL_TOKEN: &str = "test-internal-token";

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Test harness that manages test infrastructure.
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let deps = ctx.deps();
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    /// Database pool - use this for test fixtures.
    pub db_pool: PgPool,
    /// Notifications captured by `deps()`
    pub notifier: Arc<MockNotificationDispatcher>,
    deps: ServerDeps,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        // Database pool is automatically dropped
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        Self::with_dependencies(TestDependencies::new()).await
    }

    /// Harness over custom test dependencies (e.g. mocked capabilities)
    pub async fn with_dependencies(test_deps: TestDependencies) -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        let notifier = test_deps.notifier.clone();
        let deps = test_deps.into_deps(db_pool.clone());

        Ok(Self {
            db_pool,
            notifier,
            deps,
        })
    }

    pub fn deps(&self) -> &ServerDeps {
        &self.deps
    }

    /// The full HTTP router over this harness's dependencies
    pub fn app(&self) -> Router {
        build_app(
            Arc::new(self.deps.clone()),
            AppSettings {
                allowed_origins: vec![],
                internal_api_token: TEST_INTERNAL_TOKEN.to_string(),
                default_locale: "de".to_string(),
            },
        )
    }

    pub fn token(&self, user_id: UserId, name: &str, is_admin: bool) -> String {
        JwtService::new(TEST_JWT_SECRET, TEST_JWT_ISSUER.to_string())
            .create_token(user_id, name.to_string(), is_admin)
            .expect("Failed to mint test token")
    }

    /// POST a JSON body through the router and decode the JSON response
    pub async fn post_json(
        &self,
        path: &str,
        token: Option<&str>,
        body: JsonValue,
    ) -> (StatusCode, JsonValue) {
        let mut request = Request::post(path).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = request
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");

        let response = self
            .app()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
        (status, json)
    }
}
