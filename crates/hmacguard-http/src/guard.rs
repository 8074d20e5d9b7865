//! Before-dispatch interceptors.
//!
//! A [`BeforeDispatch`] implementation inspects a fully buffered request and
//! decides whether the router may hand it to the route handler. [`HmacGuard`]
//! is the implementation backed by a shared [`Verifier`].

use std::collections::HashSet;
use std::sync::Arc;

use http::header::HeaderName;
use http::request::Parts;
use http::StatusCode;
use tracing::{debug, error, warn};

use hmacguard_auth::{AuthError, AuthResult, ClientId, SIGNATURE_HEADER, Verifier};

/// Outcome of a before-dispatch check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Let the request through to the next guard or the handler.
    Continue,
    /// Stop and answer with this status.
    Reject(StatusCode),
}

/// A check run before a request reaches its route handler.
pub trait BeforeDispatch: Send + Sync + 'static {
    /// Inspect the request head and its exact body bytes.
    fn before_dispatch(&self, parts: &Parts, body: &[u8]) -> GuardDecision;
}

impl<F> BeforeDispatch for F
where
    F: Fn(&Parts, &[u8]) -> GuardDecision + Send + Sync + 'static,
{
    fn before_dispatch(&self, parts: &Parts, body: &[u8]) -> GuardDecision {
        self(parts, body)
    }
}

/// Guard that requires a valid HMAC signature header.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use hmacguard_auth::{KeyRegistry, Verifier, VerifierConfig};
/// use hmacguard_http::guard::HmacGuard;
///
/// let registry = KeyRegistry::new().with_default_key("s3cr3tk3y").unwrap();
/// let verifier = Arc::new(Verifier::new(registry, VerifierConfig::default()).unwrap());
/// let guard = HmacGuard::new(verifier)
///     .with_header_name("X-Signature")
///     .unwrap();
/// assert_eq!(guard.header_name().as_str(), "x-signature");
/// ```
#[derive(Debug, Clone)]
pub struct HmacGuard {
    verifier: Arc<Verifier>,
    header_name: HeaderName,
    allowed_clients: Option<HashSet<ClientId>>,
    reject_status: StatusCode,
}

impl HmacGuard {
    /// Create a guard reading the [`SIGNATURE_HEADER`] header and rejecting with 403.
    #[must_use]
    pub fn new(verifier: Arc<Verifier>) -> Self {
        Self {
            verifier,
            header_name: HeaderName::from_static(SIGNATURE_HEADER),
            allowed_clients: None,
            reject_status: StatusCode::FORBIDDEN,
        }
    }

    /// Read the signature from a different header.
    ///
    /// # Errors
    /// Returns an error if `name` is not a valid header name.
    pub fn with_header_name(
        mut self,
        name: &str,
    ) -> Result<Self, http::header::InvalidHeaderName> {
        self.header_name = HeaderName::try_from(name)?;
        Ok(self)
    }

    /// Only accept named-key signatures from these clients.
    #[must_use]
    pub fn with_allowed_clients(mut self, clients: HashSet<ClientId>) -> Self {
        self.allowed_clients = Some(clients);
        self
    }

    /// Answer rejected requests with `status` instead of 403.
    #[must_use]
    pub fn with_reject_status(mut self, status: StatusCode) -> Self {
        self.reject_status = status;
        self
    }

    /// The header the signature is read from.
    #[must_use]
    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Run verification and return the precise outcome.
    ///
    /// # Errors
    /// Returns the [`AuthError`] produced by the verifier, or
    /// [`AuthError::MalformedSignature`] for a header that is not visible ASCII.
    pub fn check(&self, parts: &Parts, body: &[u8]) -> Result<AuthResult, AuthError> {
        let header = parts
            .headers
            .get(&self.header_name)
            .map(|value| value.to_str().map_err(|_| AuthError::MalformedSignature))
            .transpose()?;

        self.verifier
            .verify(header, body, self.allowed_clients.as_ref())
    }
}

impl BeforeDispatch for HmacGuard {
    fn before_dispatch(&self, parts: &Parts, body: &[u8]) -> GuardDecision {
        match self.check(parts, body) {
            Ok(result) => {
                debug!(path = parts.uri.path(), ?result, "request authenticated");
                GuardDecision::Continue
            }
            Err(err) if err.is_rejection() => {
                warn!(
                    method = %parts.method,
                    path = parts.uri.path(),
                    error = %err,
                    "rejecting unauthenticated request"
                );
                GuardDecision::Reject(self.reject_status)
            }
            Err(err) => {
                error!(path = parts.uri.path(), error = %err, "signature verification failed");
                GuardDecision::Reject(self.reject_status)
            }
        }
    }
}
