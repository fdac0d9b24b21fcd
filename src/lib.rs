//! Weighted round robin reverse proxy library.
//!
//! Services are balancers over upstream servers or over other services.
//! Selection is earliest-deadline-first on `pending / weight`, with optional
//! cookie-based stickiness and health status propagated up the tree.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{Balancer, ServiceManager};
