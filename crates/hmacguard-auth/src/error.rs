//! Error types for HMAC signing and verification.
//!
//! All failures are represented by [`AuthError`]. Verification collapses the
//! untrusted-input variants into a single rejection category (see
//! [`AuthError::is_rejection`]); the precise variant is only meant for logs.

/// Errors that can occur while signing or verifying a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No default secret key is configured but the operation needs one.
    #[error("Secret key is not set")]
    SecretKeyNotSet,

    /// The named key does not exist in the registry.
    #[error("Unknown key name: {0}")]
    UnknownKeyName(String),

    /// An empty secret was supplied where a key is required.
    #[error("Secret key must not be empty")]
    MissingKey,

    /// A client id is empty or contains the composite separator.
    #[error("Invalid client id: {0:?}")]
    InvalidClientId(String),

    /// Neither a default key nor any named key is configured.
    #[error("No signing keys configured")]
    NoKeysConfigured,

    /// The request did not carry a signature.
    #[error("Missing signature")]
    SignatureMissing,

    /// The signature could not be decoded.
    #[error("Malformed signature")]
    MalformedSignature,

    /// The signature is well-formed but does not match.
    #[error("Signature does not match")]
    InvalidSignature,
}

impl AuthError {
    /// Whether this error is an expected outcome of untrusted request input.
    ///
    /// Collaborators map every rejection to the same externally visible
    /// response. Anything else is a configuration fault.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::SignatureMissing
                | Self::MalformedSignature
                | Self::UnknownKeyName(_)
                | Self::InvalidSignature
        )
    }
}
