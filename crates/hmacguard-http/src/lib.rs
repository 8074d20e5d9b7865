//! HTTP adapter for HmacGuard.
//!
//! Routes are matched by exact path. Each route may carry before-dispatch
//! guards that see the fully buffered request body; [`HmacGuard`] rejects any
//! request whose signature header does not verify. Rejections never reveal
//! why a signature failed.
//!
//! # Modules
//!
//! - [`guard`] - Before-dispatch guards and the HMAC guard
//! - [`response`] - Response builders shared by the service and handlers
//! - [`router`] - Path routing and handler dispatch
//! - [`service`] - The hyper `Service` implementation

pub mod guard;
pub mod response;
pub mod router;
pub mod service;

pub use guard::{BeforeDispatch, GuardDecision, HmacGuard};
pub use response::GuardBody;
pub use router::{RouteHandler, Router};
pub use service::GuardedService;
