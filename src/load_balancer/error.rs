//! Load balancer error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised by a [`Balancer`](crate::load_balancer::Balancer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalancerError {
    /// Every registered server is unhealthy, or none is registered.
    #[error("no available server")]
    NoAvailableServer,

    /// A status updater was registered on a balancer built without health checks.
    #[error("health check not enabled in config for this weighted service")]
    HealthCheckDisabled,

    /// A server with this name is already registered.
    #[error("server '{0}' is already registered")]
    DuplicateName(String),
}

/// Result type for balancer operations.
pub type BalancerResult<T> = Result<T, BalancerError>;

impl IntoResponse for BalancerError {
    fn into_response(self) -> Response {
        let status = match self {
            BalancerError::NoAvailableServer => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
