// src/engine/debounce.rs

//! Per-package trailing-edge debouncing.
//!
//! Time is passed in explicitly so the logic can be tested without a clock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::PackageId;

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadlines: HashMap<PackageId, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadlines: HashMap::new(),
        }
    }

    /// A zero window disables coalescing.
    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an event for `package`, (re)arming its deadline.
    ///
    /// Returns true if the package was already waiting, i.e. this event was
    /// coalesced into an earlier one.
    pub fn record(&mut self, package: PackageId, now: Instant) -> bool {
        self.deadlines.insert(package, now + self.window).is_some()
    }

    /// Remove and return every package whose deadline is at or before `now`,
    /// earliest deadline first.
    pub fn take_due(&mut self, now: Instant) -> Vec<PackageId> {
        let mut due: Vec<(Instant, PackageId)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(pkg, deadline)| (*deadline, pkg.clone()))
            .collect();
        due.sort();

        for (_, pkg) in &due {
            self.deadlines.remove(pkg);
        }
        due.into_iter().map(|(_, pkg)| pkg).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Forget every waiting package, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.deadlines.len();
        self.deadlines.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
