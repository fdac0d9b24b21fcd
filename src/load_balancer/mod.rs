//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives at a Balancer
//!     → sticky.rs (preferred server from cookie, if configured)
//!     → wrr.rs (preferred entry if healthy, else pop earliest deadline)
//!         - queue.rs (min-heap on pending / weight)
//!         - entry.rs (per-child weight, pending and health)
//!     → handler.rs (child handler: upstream or nested Balancer)
//!     → Lease dropped → pending released, entry re-keyed
//! ```
//!
//! # Design Decisions
//! - One mutex per balancer guards scheduling state; it is never held
//!   while a child handles a request
//! - Unhealthy entries are removed lazily, when they reach the heap root
//! - Nested balancers are plain handlers; health flows upwards through
//!   status updaters registered at build time (manager.rs)

pub mod entry;
pub mod error;
pub mod handler;
pub mod manager;
pub mod queue;
pub mod sticky;
pub mod wrr;

pub use entry::EntrySnapshot;
pub use error::{BalancerError, BalancerResult};
pub use handler::{handler_fn, BalancerService, Handler, HandlerFn};
pub use manager::{BuildError, ServiceManager, ServiceSnapshot};
pub use queue::PriorityQueue;
pub use sticky::StickyCookie;
pub use wrr::{Balancer, Lease, StatusUpdater};
