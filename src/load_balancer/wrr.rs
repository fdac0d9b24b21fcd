//! Weighted round robin balancer driven by earliest-deadline-first selection.
//!
//! # Responsibilities
//! - Register named, weighted handlers
//! - Pick a handler per request in weight proportion (O(log n) per pick)
//! - Honour sticky-session preferences while the preferred handler is healthy
//! - Record health reports and tell parents when the whole pool goes up/down
//!
//! # Selection
//! Every entry's deadline is `pending / weight`. A pick takes the entry with
//! the earliest deadline and bumps its pending count, which pushes its next
//! turn back by `1 / weight`. Releasing a selection pulls it forward again.
//!
//! # Design Decisions
//! - Map, heap and healthy count sit behind one lock. It is held only for
//!   bookkeeping, never while a handler runs or while updaters are called
//! - Unhealthy entries stay in the heap until they are popped; they are
//!   dropped then instead of being searched for on every status change
//! - Updaters are registered through `&mut self`, so registration has to
//!   finish before the balancer is shared
//! - Entries are never removed, only toggled healthy/unhealthy

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use crate::health::HealthStatus;
use crate::load_balancer::entry::{Entry, EntrySnapshot};
use crate::load_balancer::error::{BalancerError, BalancerResult};
use crate::load_balancer::handler::Handler;
use crate::load_balancer::queue::PriorityQueue;
use crate::load_balancer::sticky::StickyCookie;
use crate::observability::metrics;

/// Hook run with the balancer's new aggregate status.
pub type StatusUpdater = Box<dyn Fn(bool) + Send + Sync>;

/// State guarded by the balancer lock.
#[derive(Debug, Default)]
struct Schedule {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    queue: PriorityQueue,
    healthy_count: usize,
}

/// Weighted round robin load balancer.
pub struct Balancer {
    sticky: Option<StickyCookie>,
    wants_health_check: bool,
    updaters: Vec<StatusUpdater>,
    schedule: Mutex<Schedule>,
}

impl fmt::Debug for Balancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Balancer")
            .field("sticky", &self.sticky)
            .field("wants_health_check", &self.wants_health_check)
            .field("updaters", &self.updaters.len())
            .field("schedule", &*self.schedule.lock())
            .finish()
    }
}

impl Balancer {
    /// Create an empty balancer.
    pub fn new(sticky: Option<StickyCookie>, wants_health_check: bool) -> Self {
        Self {
            sticky,
            wants_health_check,
            updaters: Vec::new(),
            schedule: Mutex::new(Schedule::default()),
        }
    }

    /// Register a handler under `name`. Weight defaults to 1.
    ///
    /// A zero weight is ignored: the handler is not registered and the call
    /// succeeds. A name that is already registered is rejected.
    pub fn add(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn Handler>,
        weight: Option<u32>,
    ) -> BalancerResult<()> {
        let name = name.into();
        let weight = weight.unwrap_or(1);
        if weight == 0 {
            tracing::debug!(server = %name, "Ignoring server with non-positive weight");
            return Ok(());
        }

        let mut schedule = self.schedule.lock();
        if schedule.by_name.contains_key(&name) {
            tracing::warn!(server = %name, "Server already registered");
            return Err(BalancerError::DuplicateName(name));
        }

        let Schedule { entries, by_name, queue, healthy_count } = &mut *schedule;
        let id = entries.len();
        entries.push(Entry::new(name.clone(), handler, weight));
        queue.push(entries, id);
        by_name.insert(name, id);
        *healthy_count += 1;
        Ok(())
    }

    /// Record that the server `name` is now healthy or not.
    ///
    /// Unknown names and repeated reports of the current status are no-ops.
    /// Updaters run only when the pool as a whole goes from no healthy server
    /// to some, or back.
    pub fn set_status(&self, name: &str, healthy: bool) {
        tracing::debug!(server = %name, status = %HealthStatus::from(healthy), "Setting server status");

        let (healthy_before, healthy_after) = {
            let mut schedule = self.schedule.lock();
            let Schedule { entries, by_name, queue, healthy_count } = &mut *schedule;
            let Some(&id) = by_name.get(name) else {
                return;
            };

            let before = *healthy_count > 0;
            if entries[id].healthy != healthy {
                entries[id].healthy = healthy;
                if healthy {
                    *healthy_count += 1;
                    // Still queued if it was never popped while down.
                    if entries[id].queue_index.is_some() {
                        queue.fix(entries, id);
                    } else {
                        queue.push(entries, id);
                    }
                } else {
                    *healthy_count -= 1;
                }
                metrics::record_status_change(name, healthy);
            }
            (before, *healthy_count > 0)
        };

        if healthy_before == healthy_after {
            tracing::debug!(status = %HealthStatus::from(healthy_before), "Pool status unchanged, no need to propagate");
            return;
        }

        tracing::debug!(status = %HealthStatus::from(healthy_after), "Propagating new pool status");
        for updater in &self.updaters {
            updater(healthy_after);
        }
    }

    /// Add a hook run whenever the aggregate status changes.
    ///
    /// Fails unless the balancer was built with health checks enabled.
    pub fn register_status_updater<F>(&mut self, updater: F) -> BalancerResult<()>
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        if !self.wants_health_check {
            return Err(BalancerError::HealthCheckDisabled);
        }
        self.updaters.push(Box::new(updater));
        Ok(())
    }

    /// Select a handler, preferring `preferred` while it is healthy.
    ///
    /// The returned lease releases the selection when dropped.
    pub fn acquire(&self, preferred: Option<&str>) -> BalancerResult<Lease<'_>> {
        let mut schedule = self.schedule.lock();
        let Schedule { entries, by_name, queue, .. } = &mut *schedule;

        if let Some(&id) = preferred.and_then(|name| by_name.get(name)) {
            if entries[id].healthy {
                entries[id].pending += 1;
                queue.fix(entries, id);
                return Ok(self.lease(&entries[id], id));
            }
        }

        loop {
            let Some(id) = queue.pop(entries) else {
                metrics::record_no_available_server();
                return Err(BalancerError::NoAvailableServer);
            };
            // Marked down since it was queued: drop it, it is pushed back
            // when it turns healthy again.
            if !entries[id].healthy {
                continue;
            }
            entries[id].pending += 1;
            queue.push(entries, id);
            tracing::debug!(server = %entries[id].name, "Server selected by WRR");
            return Ok(self.lease(&entries[id], id));
        }
    }

    fn lease(&self, entry: &Entry, id: usize) -> Lease<'_> {
        metrics::record_selection(&entry.name);
        Lease {
            balancer: self,
            id,
            name: entry.name.clone(),
            handler: entry.handler.clone(),
        }
    }

    fn release(&self, id: usize) {
        let mut schedule = self.schedule.lock();
        let Schedule { entries, queue, .. } = &mut *schedule;
        let entry = &mut entries[id];
        entry.pending = entry.pending.saturating_sub(1);
        if entry.healthy {
            queue.fix(entries, id);
        }
    }

    /// Dispatch one request: select, run the handler, release.
    pub async fn serve(&self, request: Request<Body>) -> Response<Body> {
        let preferred = self
            .sticky
            .as_ref()
            .and_then(|sticky| sticky.preferred(request.headers()));

        let lease = match self.acquire(preferred.as_deref()) {
            Ok(lease) => lease,
            Err(e) => return e.into_response(),
        };
        tracing::debug!(server = %lease.name(), "Acquired handler");

        let mut response = lease.handler().handle(request).await;
        if let Some(sticky) = &self.sticky {
            sticky.apply(response.headers_mut(), lease.name());
        }
        response
    }

    /// Pending selections per server, seed excluded.
    pub fn pending_counts(&self) -> HashMap<String, u64> {
        self.schedule
            .lock()
            .entries
            .iter()
            .map(|e| (e.name.clone(), e.pending()))
            .collect()
    }

    /// Number of servers currently marked healthy.
    pub fn healthy_count(&self) -> usize {
        self.schedule.lock().healthy_count
    }

    /// True while at least one server is healthy.
    pub fn is_healthy(&self) -> bool {
        self.healthy_count() > 0
    }

    pub fn wants_health_check(&self) -> bool {
        self.wants_health_check
    }

    /// Registered servers, sorted by name.
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        let mut entries: Vec<_> = self.schedule.lock().entries.iter().map(Entry::snapshot).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

impl Handler for Balancer {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'_, Response<Body>> {
        Box::pin(self.serve(request))
    }
}

/// A selected handler. Dropping the lease releases the selection.
pub struct Lease<'a> {
    balancer: &'a Balancer,
    id: usize,
    name: String,
    handler: Arc<dyn Handler>,
}

impl Lease<'_> {
    /// Name of the selected server.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for Lease<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("name", &self.name).finish()
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.balancer.release(self.id);
    }
}
