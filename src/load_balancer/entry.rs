//! Scheduling entry for one registered server.
//!
//! # Responsibilities
//! - Hold the server's handler, weight and health flag
//! - Track pending selections (the numerator of the EDF key)
//! - Remember the entry's heap position while it is queued
//!
//! # Design Decisions
//! - Pending starts at 1. A fresh entry with 0 pending would have the lowest
//!   possible key and take a burst of selections before settling; seeding at
//!   1 lets it join the rotation at its steady-state share. Everything that
//!   reports pending counts subtracts this seed again.
//! - All fields are mutated under the balancer's lock only

use std::sync::Arc;

use serde::Serialize;

use crate::load_balancer::handler::Handler;
use crate::load_balancer::queue::Scheduled;

/// Pending count of a freshly registered entry.
pub(crate) const INITIAL_PENDING: u64 = 1;

/// A named, weighted server known to a balancer.
#[derive(Debug)]
pub struct Entry {
    pub(crate) name: String,
    pub(crate) weight: f64,
    pub(crate) pending: u64,
    pub(crate) healthy: bool,
    pub(crate) queue_index: Option<usize>,
    pub(crate) handler: Arc<dyn Handler>,
}

impl Entry {
    pub(crate) fn new(name: String, handler: Arc<dyn Handler>, weight: u32) -> Self {
        Self {
            name,
            weight: f64::from(weight),
            pending: INITIAL_PENDING,
            healthy: true,
            queue_index: None,
            handler,
        }
    }

    /// Pending selections as seen from outside (seed excluded).
    pub fn pending(&self) -> u64 {
        self.pending.saturating_sub(INITIAL_PENDING)
    }

    pub(crate) fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            name: self.name.clone(),
            weight: self.weight,
            healthy: self.healthy,
            pending: self.pending(),
        }
    }
}

impl Scheduled for Entry {
    fn deadline(&self) -> f64 {
        self.pending as f64 / self.weight
    }

    fn queue_index(&self) -> Option<usize> {
        self.queue_index
    }

    fn set_queue_index(&mut self, index: Option<usize>) {
        self.queue_index = index;
    }
}

/// Point-in-time view of an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySnapshot {
    pub name: String,
    pub weight: f64,
    pub healthy: bool,
    pub pending: u64,
}
