use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::{middleware::Next, response::Response};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::{AuthError, UserId};
use crate::domains::auth::JwtService;
use crate::domains::chats::models::User;
use crate::domains::chats::ChatUser;
use crate::kernel::ServerDeps;
use crate::server::error::ApiError;

/// Authenticated user information from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: UserId,
    pub name: String,
    pub is_admin: bool,
}

impl AuthUser {
    pub fn chat_user(&self) -> ChatUser {
        ChatUser {
            id: self.user_id,
            name: self.name.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// RPC handlers take `AuthUser` as an argument; a request without a valid
/// token is rejected with 401 before the handler runs.
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AuthError::AuthenticationRequired.into())
    }
}

/// JWT authentication middleware
///
/// Verifies the bearer token and adds `AuthUser` to request extensions. The
/// user row is refreshed from the claims so memberships can reference it and
/// presence stays current. Requests without a valid token continue
/// unauthenticated.
pub async fn jwt_auth_middleware(
    deps: Arc<ServerDeps>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(user) = extract_auth_user(&request, &deps.jwt_service) {
        if let Err(e) = User::upsert_seen(user.user_id, &user.name, &deps.db_pool).await {
            warn!(user_id = %user.user_id, error = %e, "Failed to refresh user from token");
        }
        debug!(user_id = %user.user_id, is_admin = user.is_admin, "Authenticated user");
        request.extensions_mut().insert(user);
    } else {
        debug!("No valid authentication token");
    }

    next.run(request).await
}

/// Extract and verify JWT token from request
fn extract_auth_user(
    request: &axum::http::Request<axum::body::Body>,
    jwt_service: &JwtService,
) -> Option<AuthUser> {
    let auth_header = request.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    let token = auth_str.strip_prefix("Bearer ")?;

    let claims = jwt_service.verify_token(token).ok()?;

    Some(AuthUser {
        user_id: claims.user_id(),
        name: claims.name,
        is_admin: claims.is_admin,
    })
}
