use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub allowed_origins: Vec<String>,
    /// Shared secret for `/internal/*` callers
    pub internal_api_token: String,
    pub chat_creation_enabled: bool,
    pub send_messages_enabled: bool,
    /// JSON alert script; the bundled one is used when unset
    pub alert_settings_path: Option<String>,
    pub default_locale: String,
    /// Where notifications are POSTed; logged only when unset
    pub notification_webhook_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "chat-core".to_string()),
            allowed_origins: parse_list(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            internal_api_token: env::var("INTERNAL_API_TOKEN")
                .context("INTERNAL_API_TOKEN must be set")?,
            chat_creation_enabled: flag("CHAT_CREATION_ENABLED", true)?,
            send_messages_enabled: flag("SEND_MESSAGES_ENABLED", true)?,
            alert_settings_path: non_empty(env::var("ALERT_SETTINGS_PATH").ok()),
            default_locale: env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "de".to_string()),
            notification_webhook_url: non_empty(env::var("NOTIFICATION_WEBHOOK_URL").ok()),
        })
    }
}

fn flag(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => parse_bool(&raw).with_context(|| format!("{} must be a boolean", name)),
        Err(_) => Ok(default),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognised boolean '{}'", other),
    }
}

/// Comma separated list, blanks dropped
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
