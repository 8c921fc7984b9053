use thiserror::Error;

/// Authentication and capability errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Capability disabled: {0}")]
    CapabilityDisabled(String),

    #[error("Admin access required")]
    AdminRequired,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
