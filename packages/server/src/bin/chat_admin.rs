//! Operator CLI: migrations, organiser sync, roster import and token minting.
//!
//! Prints one JSON object per command so it can be scripted.

use std::sync::Arc;

use anyhow::{Context, Result};
use chat_core::common::UserId;
use chat_core::config::Config;
use chat_core::domains::auth::JwtService;
use chat_core::domains::chats::activities::reconcile_organisers;
use chat_core::domains::chats::models::{Enrollment, User};
use chat_core::domains::chats::AlertSettings;
use chat_core::kernel::{LogNotificationDispatcher, PostgresCapabilityService, ServerDeps};
use clap::{Parser, Subcommand};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chat_admin")]
#[command(about = "Chat service administration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,

    /// Sync a course chat's admins with the given organiser ids
    ReconcileOrganisers {
        course_id: String,
        /// Organiser user ids; pass none to clear the organiser set
        organiser_ids: Vec<UserId>,
    },

    /// Add a user to a course roster
    Enroll {
        course_id: String,
        user_id: UserId,
        /// Display name, used if the user has no row yet
        #[arg(long)]
        name: Option<String>,
    },

    /// Issue a bearer token (local testing)
    MintToken {
        user_id: UserId,
        name: String,
        #[arg(long)]
        admin: bool,
    },
}

async fn connect(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,chat_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let output = match cli.command {
        Commands::Migrate => {
            let pool = connect(&config).await?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            json!({ "success": true })
        }

        Commands::ReconcileOrganisers {
            course_id,
            organiser_ids,
        } => {
            let pool = connect(&config).await?;
            let deps = ServerDeps::new(
                pool.clone(),
                Arc::new(LogNotificationDispatcher),
                Arc::new(PostgresCapabilityService::new(
                    pool,
                    config.chat_creation_enabled,
                    config.send_messages_enabled,
                )),
                Arc::new(AlertSettings::builtin()),
                Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone())),
            );
            let report = reconcile_organisers(&course_id, &organiser_ids, &deps)
                .await
                .context("Reconciliation failed")?;
            json!({ "success": true, "report": report })
        }

        Commands::Enroll {
            course_id,
            user_id,
            name,
        } => {
            let pool = connect(&config).await?;
            if let Some(name) = name {
                User::upsert_seen(user_id, &name, &pool).await?;
            }
            Enrollment::enroll(&course_id, user_id, &pool).await?;
            json!({ "success": true })
        }

        Commands::MintToken {
            user_id,
            name,
            admin,
        } => {
            let jwt = JwtService::new(&config.jwt_secret, config.jwt_issuer.clone());
            let token = jwt.create_token(user_id, name, admin)?;
            json!({ "success": true, "token": token })
        }
    };

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}
