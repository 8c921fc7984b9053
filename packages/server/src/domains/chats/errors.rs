use thiserror::Error;

use crate::common::AuthError;

/// Errors surfaced by chat activities
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;

impl ChatError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ChatError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ChatError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ChatError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ChatError::Conflict(msg.into())
    }

    /// Stable machine-readable code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::BadRequest(_) => "bad_request",
            ChatError::Forbidden(_) => "forbidden",
            ChatError::NotFound(_) => "not_found",
            ChatError::Conflict(_) => "conflict",
            ChatError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        ChatError::Internal(err.into())
    }
}

impl From<AuthError> for ChatError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::CapabilityDisabled(cap) => {
                ChatError::Forbidden(format!("{} is currently disabled", cap))
            }
            AuthError::AdminRequired => ChatError::Forbidden("Admin access required".into()),
            AuthError::AuthenticationRequired | AuthError::InvalidToken => {
                ChatError::Forbidden(err.to_string())
            }
            AuthError::InternalError(e) => ChatError::Internal(e),
        }
    }
}

/// True if the error chain bottoms out in a Postgres unique violation.
///
/// Model functions return `anyhow::Result`, so the `sqlx::Error` has to be
/// dug back out before the activity can decide between "lost a race" and
/// "something broke".
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
