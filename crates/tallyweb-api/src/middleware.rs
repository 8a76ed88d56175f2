//! Request logging and the catch-all response for unregistered routes

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// One inbound request, as seen before it reaches a controller
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEvent {
    pub timestamp: String,
    pub method: String,
    pub path: String,
}

impl std::fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} | HTTP | {} {}", self.timestamp, self.method, self.path)
    }
}

/// Sink for request events
pub trait RequestLogger: Send + Sync {
    fn record(&self, event: &RequestEvent);
}

/// Request logger reference type
pub type RequestLoggerRef = Arc<dyn RequestLogger>;

/// Writes request events through the `log` crate
#[derive(Debug, Default)]
pub struct LogRequestLogger;

impl RequestLogger for LogRequestLogger {
    fn record(&self, event: &RequestEvent) {
        log::info!(target: "tallyweb::http", "{}", event);
    }
}

/// Discards request events
#[derive(Debug, Default)]
pub struct NoopRequestLogger;

impl RequestLogger for NoopRequestLogger {
    fn record(&self, _event: &RequestEvent) {}
}

/// Middleware recording method, path and time of every request
pub async fn route_log(
    State(logger): State<RequestLoggerRef>,
    request: Request,
    next: Next,
) -> Response {
    logger.record(&RequestEvent {
        timestamp: tallyweb_utils::now_iso(),
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
    });

    next.run(request).await
}

/// Response for any path or method nothing is registered for
pub async fn unused_route() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Unused Route")
}
