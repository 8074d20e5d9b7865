//! Route table served by the binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::StatusCode;
use http::request::Parts;
use tracing::info;

use hmacguard_auth::Verifier;
use hmacguard_core::GuardConfig;
use hmacguard_http::response::text_response;
use hmacguard_http::{GuardBody, HmacGuard, Router};

/// Always reachable, no signature required.
pub const OPEN_PATH: &str = "/no_auth_view";
/// Requires a signature from the default key or any named client.
pub const GUARDED_PATH: &str = "/hmac_auth_view";
/// Requires a signature from a client listed in `HMAC_ALLOWED_CLIENTS`.
pub const RESTRICTED_PATH: &str = "/service_auth_view";

async fn open_view(_parts: Parts, _body: Bytes) -> http::Response<GuardBody> {
    text_response(StatusCode::OK, "no_auth_view")
}

async fn guarded_view(_parts: Parts, _body: Bytes) -> http::Response<GuardBody> {
    text_response(StatusCode::OK, "hmac_auth_view")
}

async fn restricted_view(_parts: Parts, _body: Bytes) -> http::Response<GuardBody> {
    text_response(StatusCode::OK, "service_auth_view")
}

/// Build the router, wiring every guarded route to the shared verifier.
///
/// The restricted route is only mounted when an allow-list is configured.
pub fn build_router(config: &GuardConfig, verifier: &Arc<Verifier>) -> Result<Router> {
    let guard = HmacGuard::new(Arc::clone(verifier))
        .with_header_name(&config.header_name)
        .with_context(|| format!("invalid signature header name: {}", config.header_name))?;

    let mut router = Router::new()
        .route(OPEN_PATH, open_view)
        .guarded_route(GUARDED_PATH, guard.clone(), guarded_view);

    if let Some(allowed) = config.allowed_client_set()? {
        info!(clients = allowed.len(), path = RESTRICTED_PATH, "mounting restricted route");
        router = router.guarded_route(
            RESTRICTED_PATH,
            guard.with_allowed_clients(allowed),
            restricted_view,
        );
    }

    Ok(router)
}
