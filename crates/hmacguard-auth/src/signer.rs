//! Signature production.
//!
//! [`Signer`] is what a client runs to produce the header value, and what the
//! verifier runs to compute the value it expects. Both sides share this code
//! path so the wire format cannot drift between them.

use std::sync::Arc;

use crate::codec::{EncodedSignature, encode, encode_composite};
use crate::digest::{HashAlgorithm, compute_digest};
use crate::error::AuthError;
use crate::keys::{ClientId, KeyRegistry, KeyResolver, SecretKey};

/// Produces encoded signatures from a key source.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use hmacguard_auth::digest::HashAlgorithm;
/// use hmacguard_auth::keys::KeyRegistry;
/// use hmacguard_auth::signer::Signer;
///
/// let registry = KeyRegistry::new().with_named_key("a", "aa").unwrap();
/// let signer = Signer::new(Arc::new(registry), HashAlgorithm::Sha256);
///
/// let header = signer.sign_for("a", b"payload").unwrap();
/// assert!(!header.as_str().is_empty());
/// ```
#[derive(Debug)]
pub struct Signer<R: KeyResolver = KeyRegistry> {
    keys: Arc<R>,
    algorithm: HashAlgorithm,
}

impl<R: KeyResolver> Clone for Signer<R> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
            algorithm: self.algorithm,
        }
    }
}

impl<R: KeyResolver> Signer<R> {
    /// Create a signer over `keys` using `algorithm`.
    #[must_use]
    pub fn new(keys: Arc<R>, algorithm: HashAlgorithm) -> Self {
        Self { keys, algorithm }
    }

    /// The hash algorithm in use.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The key source this signer resolves secrets from.
    #[must_use]
    pub fn keys(&self) -> &R {
        &self.keys
    }

    /// Sign `message` with the default secret.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SecretKeyNotSet`] if no default secret is configured.
    pub fn sign(&self, message: &[u8]) -> Result<EncodedSignature, AuthError> {
        let secret = self.keys.resolve_default()?;
        sign_with(secret, message, self.algorithm)
    }

    /// Sign `message` with the secret named `client_id` and return the
    /// transport-encoded composite header value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownKeyName`] if `client_id` is not registered.
    pub fn sign_for(&self, client_id: &str, message: &[u8]) -> Result<EncodedSignature, AuthError> {
        let secret = self.keys.resolve_named(client_id)?;
        let client_id = ClientId::new(client_id)?;
        let digest = sign_with(secret, message, self.algorithm)?;
        Ok(encode_composite(&client_id, &digest))
    }
}

/// Sign `message` with an explicit secret, returning the encoded digest.
///
/// # Errors
///
/// Returns [`AuthError::MissingKey`] for an empty secret.
pub fn sign_with(
    secret: &SecretKey,
    message: &[u8],
    algorithm: HashAlgorithm,
) -> Result<EncodedSignature, AuthError> {
    compute_digest(secret.expose(), message, algorithm).map(|raw| encode(&raw))
}
