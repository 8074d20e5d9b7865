//! The hyper `Service` tying routing, guards and dispatch together.
//!
//! [`GuardedService`] processes each request as follows:
//!
//! 1. Health check interception (`GET /health`)
//! 2. Route lookup by exact path (404 when missing)
//! 3. Request body collection
//! 4. Before-dispatch guards, in registration order
//! 5. Dispatch to the route handler

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::service::Service;
use tracing::{debug, warn};

use crate::guard::GuardDecision;
use crate::response::{
    GuardBody, bad_request_response, health_check_response, not_found_response,
    rejection_response,
};
use crate::router::Router;

/// HTTP service that runs route guards before dispatching.
///
/// Cloning is cheap; all clones share one [`Router`].
#[derive(Debug, Clone)]
pub struct GuardedService {
    router: Arc<Router>,
}

impl GuardedService {
    /// Create a service from a router.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }
}

impl<B> Service<http::Request<B>> for GuardedService
where
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: fmt::Display + Send,
{
    type Response = http::Response<GuardBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let router = Arc::clone(&self.router);
        Box::pin(async move { Ok(process_request(req, &router).await) })
    }
}

/// Process an incoming request through the guard pipeline.
async fn process_request<B>(req: http::Request<B>, router: &Router) -> http::Response<GuardBody>
where
    B: http_body::Body + Send,
    B::Data: Send,
    B::Error: fmt::Display + Send,
{
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    debug!(%method, path, "processing request");

    if is_health_check(&method, &path) {
        return health_check_response();
    }

    let Some(route) = router.resolve(&path) else {
        debug!(%method, path, "no route");
        return not_found_response();
    };

    let (parts, incoming) = req.into_parts();
    let body = match incoming.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(%method, path, error = %err, "failed to collect request body");
            return bad_request_response();
        }
    };

    if let GuardDecision::Reject(status) = route.check_guards(&parts, &body) {
        return rejection_response(status);
    }

    route.dispatch(parts, body).await
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && path == "/health"
}
