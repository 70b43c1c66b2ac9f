//! Axum middleware layers applied to the router.
//!
//! Request tracing, timeout enforcement and response compression are added in
//! [`router::build`](super::router::build); CORS is configured here. The
//! per-route session guard lives in [`crate::auth::require_session`].

use std::time::Duration;

use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Any origin, the verbs the API uses, and the headers browsers send with them.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
}
