//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the entry balancer as fallback service
//! - Wire up middleware (request ID, tracing, timeout, metrics)
//! - Bind server to listener and shut down gracefully

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ListenerConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::load_balancer::{Balancer, BalancerService};
use crate::observability::metrics;

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server dispatching every request to `entry`.
    pub fn new(config: &ListenerConfig, entry: Arc<Balancer>) -> Self {
        Self {
            router: Self::build_router(config, entry),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, entry: Arc<Balancer>) -> Router {
        Router::new()
            .fallback_service(BalancerService::new(entry))
            .layer(middleware::from_fn(record_request))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn record_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    tracing::debug!(
        request_id = %request.request_id(),
        method = %method,
        path = %request.uri().path(),
        "Proxying request"
    );

    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
