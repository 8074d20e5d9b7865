//! Configuration and error types for HmacGuard.
//!
//! This crate turns process configuration (environment variables) into a
//! ready-to-share [`Verifier`](hmacguard_auth::Verifier), failing fast at
//! startup when no signing key can be resolved.

mod config;
mod error;

pub use config::GuardConfig;
pub use error::{GuardError, GuardResult};
