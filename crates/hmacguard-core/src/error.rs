//! Error types for the HmacGuard core.

use hmacguard_auth::AuthError;

/// Core error type for HmacGuard infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Key material rejected by the signing engine.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Convenience result type for HmacGuard operations.
pub type GuardResult<T> = Result<T, GuardError>;
