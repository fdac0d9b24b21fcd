//! Health state subsystem.
//!
//! # Data Flow
//! ```text
//! External checker (admin API, wrrctl, ...)
//!     → Balancer::set_status(server, healthy)
//!     → healthy count crosses 0 ↔ 1?
//!         no  → nothing else happens
//!         yes → status updaters (propagation.rs)
//!             → parent Balancer::set_status(child, up)
//! ```
//!
//! # Design Decisions
//! - Probing servers is not done here; only outcomes are recorded
//! - Health state is per-server inside a balancer, Up/Down per pool
//! - Propagation stops at the first pool whose aggregate does not change

pub mod propagation;
pub mod state;

pub use propagation::propagate_to;
pub use state::HealthStatus;
