//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, entry service).
    pub listener: ListenerConfig,

    /// Weighted services, leaves and nested.
    pub services: Vec<ServiceConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Name of the service every request is dispatched to.
    pub service: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            service: "default".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// A weighted round robin service.
///
/// Either `servers` (upstream URLs) or `services` (other services, nested)
/// must be set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique service identifier.
    pub name: String,

    /// Accept status reports and propagate the aggregate status upwards.
    #[serde(default)]
    pub health_check: bool,

    /// Optional sticky sessions.
    #[serde(default)]
    pub sticky: Option<StickyConfig>,

    /// Upstream servers.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Child services.
    #[serde(default)]
    pub services: Vec<WeightedServiceConfig>,
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server identifier, unique within its service.
    pub name: String,

    /// Base URL (e.g., "http://127.0.0.1:3000").
    pub url: String,

    /// Weight for weighted load balancing (default: 1, 0 disables the server).
    #[serde(default)]
    pub weight: Option<u32>,
}

/// Reference to a child service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeightedServiceConfig {
    /// Name of the referenced service.
    pub name: String,

    /// Weight for weighted load balancing (default: 1, 0 disables the child).
    #[serde(default)]
    pub weight: Option<u32>,
}

/// Sticky session configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StickyConfig {
    /// Cookie settings; stickiness is off without them.
    #[serde(default)]
    pub cookie: Option<StickyCookieConfig>,
}

/// Sticky cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StickyCookieConfig {
    /// Cookie name.
    pub name: String,

    /// Set the `Secure` attribute.
    #[serde(default)]
    pub secure: bool,

    /// Set the `HttpOnly` attribute.
    #[serde(default)]
    pub http_only: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
