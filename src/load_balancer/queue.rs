//! Earliest-deadline-first priority queue.
//!
//! # Responsibilities
//! - Keep the currently offerable entries in a binary min-heap
//! - Order entries by their virtual deadline (`pending / weight`)
//! - Keep every queued entry's own heap position up to date
//!
//! # Design Decisions
//! - The heap stores entry ids; the entries live in the balancer's arena and
//!   are passed in on every call, so the queue never owns scheduling state
//! - Each entry records its heap position, which lets `fix` re-heapify a
//!   re-keyed entry in O(log n) without searching for it
//! - Ties are resolved by sift order only. A child replaces its parent only
//!   when it is strictly earlier, so equal keys keep their current layout

/// An item that can be scheduled by [`PriorityQueue`].
pub trait Scheduled {
    /// Virtual deadline; smaller is picked sooner.
    fn deadline(&self) -> f64;

    /// Current heap position, `None` when the item is not queued.
    fn queue_index(&self) -> Option<usize>;

    /// Record a new heap position.
    fn set_queue_index(&mut self, index: Option<usize>);
}

/// Array-backed binary min-heap over item ids.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: Vec<usize>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued ids.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Insert `id` and sift it up to its place.
    pub fn push<T: Scheduled>(&mut self, items: &mut [T], id: usize) {
        let index = self.heap.len();
        self.heap.push(id);
        items[id].set_queue_index(Some(index));
        self.up(items, index);
    }

    /// Remove and return the id with the earliest deadline.
    pub fn pop<T: Scheduled>(&mut self, items: &mut [T]) -> Option<usize> {
        let last = self.heap.len().checked_sub(1)?;
        self.swap(items, 0, last);
        self.down(items, 0, last);
        let id = self.heap.pop()?;
        items[id].set_queue_index(None);
        Some(id)
    }

    /// Restore heap order after the deadline of a queued `id` changed.
    ///
    /// Ids that are not queued are left alone.
    pub fn fix<T: Scheduled>(&mut self, items: &mut [T], id: usize) {
        let Some(index) = items[id].queue_index() else {
            return;
        };
        debug_assert_eq!(self.heap.get(index), Some(&id), "stale queue index");
        if !self.down(items, index, self.heap.len()) {
            self.up(items, index);
        }
    }

    fn less<T: Scheduled>(&self, items: &[T], i: usize, j: usize) -> bool {
        items[self.heap[i]].deadline() < items[self.heap[j]].deadline()
    }

    fn swap<T: Scheduled>(&mut self, items: &mut [T], i: usize, j: usize) {
        self.heap.swap(i, j);
        items[self.heap[i]].set_queue_index(Some(i));
        items[self.heap[j]].set_queue_index(Some(j));
    }

    fn up<T: Scheduled>(&mut self, items: &mut [T], mut child: usize) {
        while child > 0 {
            let parent = (child - 1) / 2;
            if !self.less(items, child, parent) {
                break;
            }
            self.swap(items, parent, child);
            child = parent;
        }
    }

    /// Sift down within `heap[..n]`. Returns true if the item moved.
    fn down<T: Scheduled>(&mut self, items: &mut [T], start: usize, n: usize) -> bool {
        let mut parent = start;
        loop {
            let left = 2 * parent + 1;
            if left >= n {
                break;
            }
            let mut child = left;
            let right = left + 1;
            if right < n && self.less(items, right, left) {
                child = right;
            }
            if !self.less(items, child, parent) {
                break;
            }
            self.swap(items, parent, child);
            parent = child;
        }
        parent > start
    }
}
