//! Exact-path routing with per-route guard chains.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;

use crate::guard::{BeforeDispatch, GuardDecision};
use crate::response::GuardBody;

/// Boxed future returned by route handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = http::Response<GuardBody>> + Send>>;

/// Business logic behind a route.
///
/// This trait is the boundary between the guard layer and the application.
/// Any `Fn(Parts, Bytes) -> impl Future<Output = Response>` implements it.
pub trait RouteHandler: Send + Sync + 'static {
    /// Produce the response for an authorized request.
    fn handle(&self, parts: Parts, body: Bytes) -> HandlerFuture;
}

impl<F, Fut> RouteHandler for F
where
    F: Fn(Parts, Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = http::Response<GuardBody>> + Send + 'static,
{
    fn handle(&self, parts: Parts, body: Bytes) -> HandlerFuture {
        Box::pin(self(parts, body))
    }
}

/// A handler together with the guards that run before it.
#[derive(Clone)]
pub struct Route {
    handler: Arc<dyn RouteHandler>,
    guards: Vec<Arc<dyn BeforeDispatch>>,
}

impl Route {
    /// Run guards in registration order; the first rejection wins.
    #[must_use]
    pub fn check_guards(&self, parts: &Parts, body: &[u8]) -> GuardDecision {
        for guard in &self.guards {
            if let GuardDecision::Reject(status) = guard.before_dispatch(parts, body) {
                return GuardDecision::Reject(status);
            }
        }
        GuardDecision::Continue
    }

    /// Dispatch to the handler.
    #[must_use]
    pub fn dispatch(&self, parts: Parts, body: Bytes) -> HandlerFuture {
        self.handler.handle(parts, body)
    }

    /// Number of guards protecting this route.
    #[must_use]
    pub fn guard_count(&self) -> usize {
        self.guards.len()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("guards", &self.guards.len())
            .finish_non_exhaustive()
    }
}

/// Maps request paths to routes.
///
/// # Examples
///
/// ```
/// use hmacguard_http::response::text_response;
/// use hmacguard_http::router::Router;
///
/// let router = Router::new().route(
///     "/ping",
///     |_parts: http::request::Parts, _body: bytes::Bytes| async {
///         text_response(http::StatusCode::OK, "pong")
///     },
/// );
/// assert!(router.resolve("/ping").is_some());
/// assert!(router.resolve("/other").is_none());
/// ```
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<String, Route>,
}

impl Router {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unguarded route.
    #[must_use]
    pub fn route(self, path: impl Into<String>, handler: impl RouteHandler) -> Self {
        self.route_with_guards(path, Vec::new(), handler)
    }

    /// Register a route protected by a single guard.
    #[must_use]
    pub fn guarded_route(
        self,
        path: impl Into<String>,
        guard: impl BeforeDispatch,
        handler: impl RouteHandler,
    ) -> Self {
        self.route_with_guards(path, vec![Arc::new(guard)], handler)
    }

    /// Register a route protected by a chain of guards.
    #[must_use]
    pub fn route_with_guards(
        mut self,
        path: impl Into<String>,
        guards: Vec<Arc<dyn BeforeDispatch>>,
        handler: impl RouteHandler,
    ) -> Self {
        self.routes.insert(
            path.into(),
            Route {
                handler: Arc::new(handler),
                guards,
            },
        );
        self
    }

    /// Look up the route for `path`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.get(path)
    }

    /// Registered paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.paths())
            .finish()
    }
}
