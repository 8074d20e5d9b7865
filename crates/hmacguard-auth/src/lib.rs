//! Shared-secret HMAC request authentication for HmacGuard.
//!
//! This crate verifies that a request body was signed by a holder of a shared
//! secret. It performs no session or identity management: a request either
//! carries a valid signature or it is rejected.
//!
//! # Overview
//!
//! Two wire formats are supported, selected by which secrets are configured:
//!
//! - **Single secret**: the header carries `base64url(HMAC(secret, body))`.
//! - **Named secrets**: the header carries
//!   `base64url(client_id + ":" + base64url(HMAC(secret[client_id], body)))`.
//!
//! A [`Verifier`] recomputes the expected value with the same [`Signer`] a
//! client would use and compares in constant time.
//!
//! # Usage
//!
//! ```rust
//! use hmacguard_auth::{KeyRegistry, Verifier, VerifierConfig};
//!
//! let registry = KeyRegistry::new().with_default_key("s3cr3tk3y").unwrap();
//! let verifier = Verifier::new(registry, VerifierConfig::default()).unwrap();
//!
//! let body = br#"{"foo":"boo"}"#;
//! let signature = verifier.sign(body).unwrap();
//! assert!(verifier.verify(Some(signature.as_str()), body, None).is_ok());
//! assert!(verifier.verify(Some(signature.as_str()), br#"{"foo":"bla"}"#, None).is_err());
//! ```
//!
//! # Modules
//!
//! - [`codec`] - Base64 and composite wire encoding
//! - [`digest`] - Keyed digest computation
//! - [`error`] - Authentication error types
//! - [`keys`] - Key registry, resolver trait and rotation store
//! - [`signer`] - Signature production
//! - [`verifier`] - Signature verification

pub mod codec;
pub mod digest;
pub mod error;
pub mod keys;
pub mod signer;
pub mod verifier;

pub use codec::{CompositeSignature, EncodedSignature, SIGNATURE_HEADER};
pub use self::digest::HashAlgorithm;
pub use error::AuthError;
pub use keys::{ClientId, KeyRegistry, KeyResolver, KeyStore, SecretKey};
pub use signer::Signer;
pub use verifier::{AuthResult, Verifier, VerifierConfig};
