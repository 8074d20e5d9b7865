//! Secret key resolution.
//!
//! A [`KeyRegistry`] holds at most one default secret and any number of
//! named per-client secrets. It is immutable once built; rotation goes
//! through [`KeyStore::replace`], which swaps in a whole new snapshot so that
//! concurrent verifications never observe a partially updated key set.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec::COMPOSITE_SEPARATOR;
use crate::error::AuthError;

/// Identifier of a client holding a named secret.
///
/// Never empty and never contains `:`, so it can be embedded in a composite
/// signature unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(String);

impl ClientId {
    /// Create a client id.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidClientId`] if the id is empty or contains `:`.
    pub fn new(id: impl Into<String>) -> Result<Self, AuthError> {
        let id = id.into();
        if id.is_empty() || id.contains(COMPOSITE_SEPARATOR) {
            return Err(AuthError::InvalidClientId(id));
        }
        Ok(Self(id))
    }

    /// Get the client id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ClientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared secret bytes. Zeroed on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Wrap secret bytes.
    ///
    /// # Errors
    /// Returns [`AuthError::MissingKey`] for an empty secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::MissingKey);
        }
        Ok(Self(secret))
    }

    /// Expose the raw secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Trait for looking up secrets.
///
/// Implementations may back this with configuration, a vault, or any other
/// store, as long as lookups do not mutate shared state.
pub trait KeyResolver: Send + Sync {
    /// Resolve the default, unnamed secret.
    ///
    /// # Errors
    /// Returns [`AuthError::SecretKeyNotSet`] if no default secret exists.
    fn resolve_default(&self) -> Result<&SecretKey, AuthError>;

    /// Resolve the secret for `client_id`.
    ///
    /// # Errors
    /// Returns [`AuthError::UnknownKeyName`] if the client is not registered.
    fn resolve_named(&self, client_id: &str) -> Result<&SecretKey, AuthError>;

    /// Whether any named secret is registered.
    fn has_named_keys(&self) -> bool;
}

/// In-memory registry of a default secret and named per-client secrets.
///
/// # Examples
///
/// ```
/// use hmacguard_auth::keys::{KeyRegistry, KeyResolver};
///
/// let registry = KeyRegistry::new()
///     .with_default_key("s3cr3tk3y")
///     .unwrap()
///     .with_named_key("billing", "b1ll1ng")
///     .unwrap();
///
/// assert_eq!(registry.resolve_named("billing").unwrap().expose(), b"b1ll1ng");
/// assert!(registry.resolve_named("unknown").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    default_key: Option<SecretKey>,
    named_keys: HashMap<ClientId, SecretKey>,
}

impl KeyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default secret.
    ///
    /// # Errors
    /// Returns [`AuthError::MissingKey`] for an empty secret.
    pub fn with_default_key(mut self, secret: impl AsRef<[u8]>) -> Result<Self, AuthError> {
        self.default_key = Some(SecretKey::new(secret.as_ref())?);
        Ok(self)
    }

    /// Register a named secret, replacing any previous secret for the same client.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidClientId`] or [`AuthError::MissingKey`].
    pub fn with_named_key(
        mut self,
        client_id: impl Into<String>,
        secret: impl AsRef<[u8]>,
    ) -> Result<Self, AuthError> {
        let client_id = ClientId::new(client_id)?;
        let secret = SecretKey::new(secret.as_ref())?;
        self.named_keys.insert(client_id, secret);
        Ok(self)
    }

    /// Build a registry from an optional default secret and (client, secret) pairs.
    ///
    /// # Errors
    /// Propagates the first invalid client id or empty secret.
    pub fn from_parts<I, K, V>(default_key: Option<&[u8]>, named_keys: I) -> Result<Self, AuthError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<[u8]>,
    {
        let mut registry = Self::new();
        if let Some(secret) = default_key {
            registry = registry.with_default_key(secret)?;
        }
        for (client_id, secret) in named_keys {
            registry = registry.with_named_key(client_id, secret)?;
        }
        Ok(registry)
    }

    /// Whether a default secret is configured.
    #[must_use]
    pub fn has_default_key(&self) -> bool {
        self.default_key.is_some()
    }

    /// Iterate over the registered client ids, in no particular order.
    pub fn client_ids(&self) -> impl Iterator<Item = &ClientId> {
        self.named_keys.keys()
    }

    /// Check that at least one secret can be resolved.
    ///
    /// # Errors
    /// Returns [`AuthError::NoKeysConfigured`] for an empty registry.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.default_key.is_none() && self.named_keys.is_empty() {
            return Err(AuthError::NoKeysConfigured);
        }
        Ok(())
    }
}

impl KeyResolver for KeyRegistry {
    fn resolve_default(&self) -> Result<&SecretKey, AuthError> {
        self.default_key.as_ref().ok_or(AuthError::SecretKeyNotSet)
    }

    fn resolve_named(&self, client_id: &str) -> Result<&SecretKey, AuthError> {
        self.named_keys
            .get(client_id)
            .ok_or_else(|| AuthError::UnknownKeyName(client_id.to_owned()))
    }

    fn has_named_keys(&self) -> bool {
        !self.named_keys.is_empty()
    }
}

/// Holder of the current [`KeyRegistry`] snapshot.
///
/// Readers clone the `Arc` and release the lock immediately, so a
/// verification always works against one consistent registry even if a
/// rotation happens concurrently.
#[derive(Debug)]
pub struct KeyStore {
    current: RwLock<Arc<KeyRegistry>>,
}

impl KeyStore {
    /// Create a store from a validated registry.
    ///
    /// # Errors
    /// Returns [`AuthError::NoKeysConfigured`] for an empty registry.
    pub fn new(registry: KeyRegistry) -> Result<Self, AuthError> {
        registry.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(registry)),
        })
    }

    /// The registry in effect right now.
    #[must_use]
    pub fn snapshot(&self) -> Arc<KeyRegistry> {
        Arc::clone(&self.current.read())
    }

    /// Atomically replace the registry, returning the previous snapshot.
    ///
    /// # Errors
    /// Returns [`AuthError::NoKeysConfigured`] and keeps the current registry
    /// if `registry` is empty.
    pub fn replace(&self, registry: KeyRegistry) -> Result<Arc<KeyRegistry>, AuthError> {
        registry.validate()?;
        let next = Arc::new(registry);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        Ok(previous)
    }
}
