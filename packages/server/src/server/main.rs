// Main entry point for the chat API server

use std::sync::Arc;

use anyhow::{Context, Result};
use chat_core::domains::auth::JwtService;
use chat_core::domains::chats::AlertSettings;
use chat_core::kernel::{
    BaseNotificationDispatcher, LogNotificationDispatcher, PostgresCapabilityService, ServerDeps,
    WebhookNotificationDispatcher,
};
use chat_core::server::{build_app, AppSettings};
use chat_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chat_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting chat API");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let alert_settings = match &config.alert_settings_path {
        Some(path) => AlertSettings::load(path)
            .with_context(|| format!("Failed to load alert settings from {}", path))?,
        None => AlertSettings::builtin(),
    };

    let notifier: Arc<dyn BaseNotificationDispatcher> = match &config.notification_webhook_url {
        Some(url) => {
            tracing::info!(url = %url, "Notifications go to webhook");
            Arc::new(WebhookNotificationDispatcher::new(url.clone())?)
        }
        None => {
            tracing::info!("No notification webhook configured, logging notifications only");
            Arc::new(LogNotificationDispatcher)
        }
    };

    let capabilities = Arc::new(PostgresCapabilityService::new(
        pool.clone(),
        config.chat_creation_enabled,
        config.send_messages_enabled,
    ));

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));

    let deps = Arc::new(ServerDeps::new(
        pool,
        notifier,
        capabilities,
        Arc::new(alert_settings),
        jwt_service,
    ));

    let app = build_app(
        deps,
        AppSettings {
            allowed_origins: config.allowed_origins.clone(),
            internal_api_token: config.internal_api_token.clone(),
            default_locale: config.default_locale.clone(),
        },
    );

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
