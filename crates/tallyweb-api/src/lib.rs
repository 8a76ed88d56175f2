//! HTTP API server for tallyweb
//!
//! - dispatch: maps a verb onto a resource model method
//! - routes: the v1 route table
//! - middleware: request logging and the 405 catch-all

pub mod dispatch;
pub mod error;
pub mod middleware;
pub mod routes;

use axum::routing::MethodRouter;
use axum::Router;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tallyweb_core::{ModelRef, PubSub};
use tokio::net::TcpListener;

pub use dispatch::Verb;
pub use error::ApiError;
pub use middleware::{LogRequestLogger, NoopRequestLogger, RequestEvent, RequestLogger, RequestLoggerRef};

struct RouteEntry {
    path: String,
    verb: Verb,
    controller: ModelRef,
}

/// Application: the route table, the event bus and the request logger
pub struct Application {
    pub_sub: Arc<PubSub>,
    request_logger: RequestLoggerRef,
    routes: Vec<RouteEntry>,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Self::with_request_logger(Arc::new(LogRequestLogger))
    }

    pub fn with_request_logger(request_logger: RequestLoggerRef) -> Self {
        Self {
            pub_sub: Arc::new(PubSub::new()),
            request_logger,
            routes: Vec::new(),
        }
    }

    /// Shared event bus
    pub fn pub_sub(&self) -> Arc<PubSub> {
        self.pub_sub.clone()
    }

    /// Bind `verb` on `path` to `controller`. Registering the same HTTP
    /// method on the same path again replaces the earlier binding.
    pub fn register_route(&mut self, path: &str, verb: Verb, controller: ModelRef) {
        if let Some(pos) = self
            .routes
            .iter()
            .position(|r| r.path == path && r.verb.method() == verb.method())
        {
            log::warn!("Replacing {} {} ({})", verb.method(), path, self.routes[pos].verb);
            self.routes.remove(pos);
        }

        log::debug!("Registered {} {} -> {}.{}", verb.method(), path, controller.name(), verb);
        self.routes.push(RouteEntry {
            path: path.to_string(),
            verb,
            controller,
        });
    }

    /// Build the axum router for everything registered so far
    pub fn router(&self) -> Router {
        let mut by_path: BTreeMap<&str, MethodRouter> = BTreeMap::new();
        for route in &self.routes {
            let wrapped = dispatch::wrap_controller(route.controller.clone(), route.verb);
            let method_router = match by_path.remove(route.path.as_str()) {
                Some(existing) => existing.merge(wrapped),
                None => wrapped,
            };
            by_path.insert(route.path.as_str(), method_router);
        }

        let mut router = Router::new();
        for (path, method_router) in by_path {
            router = router.route(path, method_router.fallback(middleware::unused_route));
        }

        router
            .fallback(middleware::unused_route)
            .layer(axum::middleware::from_fn_with_state(
                self.request_logger.clone(),
                middleware::route_log,
            ))
    }

    /// Serve until Ctrl-C
    pub async fn ready(self, addr: &str) -> anyhow::Result<()> {
        self.serve(addr, shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then let in-flight event handlers finish
    pub async fn serve<F>(self, addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        log::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        self.pub_sub.settle().await;
        log::info!("Server stopped gracefully");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
