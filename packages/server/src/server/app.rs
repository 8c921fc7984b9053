//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::kernel::ServerDeps;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    add_participants_handler, archive_chat_handler, create_chat_handler, get_chat_handler,
    get_message_handler, health_handler, list_chats_handler, list_messages_handler,
    mark_delivered_handler, mark_read_handler, online_ping_handler, organisers_changed_handler,
    post_message_handler, raise_alert_handler, remove_participant_handler, rename_chat_handler,
    update_message_content_handler, INTERNAL_TOKEN_HEADER,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
    pub internal_api_token: Arc<str>,
    pub default_locale: Arc<str>,
}

impl AppState {
    /// Locale sent by the client, or the configured default
    pub fn locale<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_locale)
    }
}

/// HTTP-level settings that are not activity dependencies
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub allowed_origins: Vec<String>,
    pub internal_api_token: String,
    pub default_locale: String,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // No configured origins means development: allow any
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(INTERNAL_TOKEN_HEADER),
        ])
}

/// Build the Axum application router
pub fn build_app(deps: Arc<ServerDeps>, settings: AppSettings) -> Router {
    let app_state = AppState {
        deps: deps.clone(),
        internal_api_token: Arc::from(settings.internal_api_token),
        default_locale: Arc::from(settings.default_locale),
    };

    let rpc = Router::new()
        .route("/createChat", post(create_chat_handler))
        .route("/postMessage", post(post_message_handler))
        .route("/updateMessageContent", post(update_message_content_handler))
        .route("/markRead", post(mark_read_handler))
        .route("/markDelivered", post(mark_delivered_handler))
        .route("/archiveChat", post(archive_chat_handler))
        .route("/removeParticipant", post(remove_participant_handler))
        .route("/addParticipants", post(add_participants_handler))
        .route("/renameChat", post(rename_chat_handler))
        .route("/listChats", post(list_chats_handler))
        .route("/getChat", post(get_chat_handler))
        .route("/listMessages", post(list_messages_handler))
        .route("/getMessage", post(get_message_handler))
        .route("/raiseAlert", post(raise_alert_handler))
        .route("/onlinePing", post(online_ping_handler))
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(deps.clone(), req, next)
        }));

    Router::new()
        .nest("/rpc", rpc)
        .route(
            "/internal/organisers-changed",
            post(organisers_changed_handler),
        )
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors_layer(&settings.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::auth::JwtService;
    use crate::domains::chats::AlertSettings;
    use crate::kernel::test_dependencies::StaticCapabilityService;
    use crate::kernel::LogNotificationDispatcher;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    /// Deps over a pool that never connects; enough for requests that are
    /// rejected before touching the database.
    fn offline_deps() -> Arc<ServerDeps> {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        Arc::new(ServerDeps::new(
            pool,
            Arc::new(LogNotificationDispatcher),
            Arc::new(StaticCapabilityService::default()),
            Arc::new(AlertSettings::builtin()),
            Arc::new(JwtService::new("secret", "chat-core".to_string())),
        ))
    }

    fn offline_app() -> Router {
        build_app(
            offline_deps(),
            AppSettings {
                allowed_origins: vec![],
                internal_api_token: "internal".to_string(),
                default_locale: "de".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn rpc_requires_a_token() {
        let response = offline_app()
            .oneshot(
                Request::post("/rpc/listChats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn internal_route_requires_shared_secret() {
        let response = offline_app()
            .oneshot(
                Request::post("/internal/organisers-changed")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"courseId":"c1","organiserIds":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let response = offline_app()
            .oneshot(
                Request::post("/internal/organisers-changed")
                    .header(CONTENT_TYPE, "application/json")
                    .header(INTERNAL_TOKEN_HEADER, "internal")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn locale_falls_back_to_default() {
        let state = AppState {
            deps: offline_deps(),
            internal_api_token: Arc::from("x"),
            default_locale: Arc::from("de"),
        };
        assert_eq!(state.locale(None), "de");
        assert_eq!(state.locale(Some(" ")), "de");
        assert_eq!(state.locale(Some("fr")), "fr");
    }
}
