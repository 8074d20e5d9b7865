//! Configuration management for HmacGuard.
//!
//! All configuration is driven by environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `HMAC_KEY` | *(unset)* | Default shared secret |
//! | `HMAC_KEYS` | *(unset)* | JSON object of named secrets, `{"client":"secret"}` |
//! | `HMAC_DISARM` | `false` | Accept every request without verification |
//! | `HMAC_HEADER` | `signature` | Header carrying the signature |
//! | `HMAC_ALGORITHM` | `sha256` | `sha1`, `sha256`, `sha384` or `sha512` |
//! | `HMAC_ALLOWED_CLIENTS` | *(unset)* | Comma-separated clients accepted on service routes |

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use hmacguard_auth::{
    ClientId, HashAlgorithm, KeyRegistry, SIGNATURE_HEADER, Verifier, VerifierConfig,
};
use tracing::info;

use crate::error::{GuardError, GuardResult};

/// Global configuration for HmacGuard.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardConfig {
    /// Bind address for the server.
    pub listen: String,
    /// Log level.
    pub log_level: String,
    /// Header carrying the signature.
    pub header_name: String,
    /// Hash algorithm used inside HMAC.
    pub hash_algorithm: HashAlgorithm,
    /// Whether verification is bypassed.
    pub disarmed: bool,
    /// Default shared secret.
    #[serde(skip_serializing)]
    pub default_key: Option<String>,
    /// Named per-client secrets.
    #[serde(skip_serializing)]
    pub named_keys: BTreeMap<String, String>,
    /// Clients accepted on routes restricted to named keys. `None` allows all.
    pub allowed_clients: Option<Vec<String>>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            header_name: SIGNATURE_HEADER.to_owned(),
            hash_algorithm: HashAlgorithm::default(),
            disarmed: false,
            default_key: None,
            named_keys: BTreeMap::new(),
            allowed_clients: None,
        }
    }
}

impl fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardConfig")
            .field("listen", &self.listen)
            .field("log_level", &self.log_level)
            .field("header_name", &self.header_name)
            .field("hash_algorithm", &self.hash_algorithm)
            .field("disarmed", &self.disarmed)
            .field("default_key", &self.default_key.as_ref().map(|_| "..."))
            .field("named_keys", &self.named_keys.keys().collect::<Vec<_>>())
            .field("allowed_clients", &self.allowed_clients)
            .finish()
    }
}

impl GuardConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns [`GuardError::Config`] for an unparsable `HMAC_KEYS` or
    /// `HMAC_ALGORITHM` value.
    pub fn from_env() -> GuardResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// See [`GuardConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> GuardResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("HMAC_HEADER") {
            config.header_name = v;
        }
        if let Some(v) = lookup("HMAC_ALGORITHM") {
            config.hash_algorithm = v
                .parse()
                .map_err(|e| GuardError::Config(format!("HMAC_ALGORITHM: {e}")))?;
        }
        if let Some(v) = lookup("HMAC_DISARM") {
            config.disarmed = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("HMAC_KEY") {
            config.default_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Some(v) = lookup("HMAC_KEYS").filter(|v| !v.trim().is_empty()) {
            config.named_keys = serde_json::from_str(&v)
                .map_err(|e| GuardError::Config(format!("HMAC_KEYS must be a JSON object: {e}")))?;
        }
        if let Some(v) = lookup("HMAC_ALLOWED_CLIENTS") {
            let clients: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect();
            config.allowed_clients = Some(clients);
        }

        Ok(config)
    }

    /// Build the key registry described by this configuration.
    ///
    /// # Errors
    /// Returns [`GuardError::Auth`] for an invalid client id or empty secret.
    pub fn key_registry(&self) -> GuardResult<KeyRegistry> {
        let registry = KeyRegistry::from_parts(
            self.default_key.as_deref().map(str::as_bytes),
            self.named_keys.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?;
        Ok(registry)
    }

    /// Build a [`Verifier`] from this configuration.
    ///
    /// # Errors
    /// Returns [`GuardError::Config`] if neither `HMAC_KEY` nor `HMAC_KEYS`
    /// provides a secret.
    pub fn build_verifier(&self) -> GuardResult<Verifier> {
        let registry = self.key_registry()?;
        let verifier_config = VerifierConfig {
            algorithm: self.hash_algorithm,
            disarmed: self.disarmed,
        };

        let verifier = Verifier::new(registry, verifier_config).map_err(|e| {
            GuardError::Config(format!("{e}: set HMAC_KEY and/or HMAC_KEYS"))
        })?;

        info!(
            algorithm = %self.hash_algorithm,
            default_key = self.default_key.is_some(),
            named_keys = self.named_keys.len(),
            disarmed = self.disarmed,
            "built HMAC verifier"
        );

        Ok(verifier)
    }

    /// The allowed client set for restricted routes, if configured.
    ///
    /// # Errors
    /// Returns [`GuardError::Auth`] for an invalid client id.
    pub fn allowed_client_set(&self) -> GuardResult<Option<HashSet<ClientId>>> {
        self.allowed_clients
            .as_ref()
            .map(|clients| {
                clients
                    .iter()
                    .map(|c| ClientId::new(c.as_str()).map_err(GuardError::from))
                    .collect::<GuardResult<HashSet<_>>>()
            })
            .transpose()
    }
}
