// src/engine/queue.rs

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::types::PackageId;

/// Pending and in-flight builds.
///
/// Semantics:
/// - `pending` is FIFO; the same package may appear more than once (one
///   entry per trigger that survived debouncing).
/// - At most `max_concurrent` builds are in flight.
/// - At most one build per package is in flight. A pending entry whose
///   package is busy stays queued while later entries for other packages
///   may start.
#[derive(Debug)]
pub struct BuildQueue {
    max_concurrent: usize,
    pending: VecDeque<PackageId>,
    in_flight: HashSet<PackageId>,
}

impl BuildQueue {
    /// `max_concurrent` is clamped to at least 1.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            pending: VecDeque::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn enqueue(&mut self, package: PackageId) {
        debug!(package = %package, pending = self.pending.len() + 1, "queued build");
        self.pending.push_back(package);
    }

    /// Move as many pending builds to in-flight as the limits allow and
    /// return them in start order.
    pub fn take_ready(&mut self) -> Vec<PackageId> {
        let mut ready = Vec::new();
        let mut idx = 0;

        while self.in_flight.len() < self.max_concurrent && idx < self.pending.len() {
            if self.in_flight.contains(&self.pending[idx]) {
                idx += 1;
                continue;
            }
            if let Some(package) = self.pending.remove(idx) {
                self.in_flight.insert(package.clone());
                ready.push(package);
            }
        }

        ready
    }

    /// Mark the in-flight build for `package` as finished.
    ///
    /// Returns false if no build for that package was in flight.
    pub fn complete(&mut self, package: &PackageId) -> bool {
        self.in_flight.remove(package)
    }

    /// Drop every pending build, returning how many were dropped.
    pub fn clear_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn is_in_flight(&self, package: &PackageId) -> bool {
        self.in_flight.contains(package)
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// No pending and no in-flight builds.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(s: &str) -> PackageId {
        PackageId::new(s.to_string())
    }

    #[test]
    fn serialized_by_default() {
        let mut q = BuildQueue::new(1);
        q.enqueue(pkg("a"));
        q.enqueue(pkg("b"));

        assert_eq!(q.take_ready(), vec![pkg("a")]);
        assert!(q.take_ready().is_empty());

        assert!(q.complete(&pkg("a")));
        assert_eq!(q.take_ready(), vec![pkg("b")]);
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        assert_eq!(BuildQueue::new(0).max_concurrent(), 1);
    }

    #[test]
    fn busy_package_does_not_block_others() {
        let mut q = BuildQueue::new(2);
        q.enqueue(pkg("a"));
        assert_eq!(q.take_ready(), vec![pkg("a")]);

        q.enqueue(pkg("a"));
        q.enqueue(pkg("b"));
        assert_eq!(q.take_ready(), vec![pkg("b")]);
        assert_eq!(q.pending_len(), 1);

        q.complete(&pkg("a"));
        assert_eq!(q.take_ready(), vec![pkg("a")]);
    }

    #[test]
    fn duplicate_pending_entries_never_run_together() {
        let mut q = BuildQueue::new(4);
        q.enqueue(pkg("a"));
        q.enqueue(pkg("a"));
        q.enqueue(pkg("a"));

        assert_eq!(q.take_ready(), vec![pkg("a")]);
        assert_eq!(q.pending_len(), 2);
        assert!(q.take_ready().is_empty());
    }

    #[test]
    fn complete_unknown_package() {
        let mut q = BuildQueue::new(1);
        assert!(!q.complete(&pkg("nope")));
    }

    #[test]
    fn clear_pending_keeps_in_flight() {
        let mut q = BuildQueue::new(1);
        q.enqueue(pkg("a"));
        q.enqueue(pkg("b"));
        q.take_ready();

        assert_eq!(q.clear_pending(), 1);
        assert!(q.is_in_flight(&pkg("a")));
        assert!(!q.is_idle());
        q.complete(&pkg("a"));
        assert!(q.is_idle());
    }
}
