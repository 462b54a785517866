//! Test utilities and mock types for claimset development.
//!
//! Provides a [`RecordingView`] that captures every [`ViewEvent`], and
//! [`ListedRules`], a [`Combinatorics`] whose valid tuples are listed
//! explicitly so scenarios can pin down exactly which claims succeed.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use claimset_core::{Combinatorics, GameView, ItemId, Tuple, ViewEvent};

pub use fixtures::{items, wait_until};

/// View that records every notification in arrival order.
#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far.
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&ViewEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| pred(e))
            .count()
    }

    /// Block until some recorded event matches `pred`, or `timeout` passes.
    pub fn wait_for(&self, timeout: Duration, pred: impl Fn(&ViewEvent) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        wait_until(deadline, || self.count(&pred) > 0)
    }
}

impl GameView for RecordingView {
    fn notify(&self, event: ViewEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Rules whose valid tuples are exactly the listed item sets.
///
/// Order inside a tuple does not matter.
#[derive(Clone, Debug)]
pub struct ListedRules {
    claim_size: usize,
    valid: Vec<BTreeSet<ItemId>>,
}

impl ListedRules {
    /// Rules with claims of `claim_size` items; each entry of `valid`
    /// lists the item IDs of one valid tuple.
    pub fn new(claim_size: usize, valid: &[&[u32]]) -> Self {
        Self {
            claim_size,
            valid: valid
                .iter()
                .map(|tuple| tuple.iter().copied().map(ItemId).collect())
                .collect(),
        }
    }
}

impl Combinatorics for ListedRules {
    fn claim_size(&self) -> usize {
        self.claim_size
    }

    fn is_valid(&self, items: &[ItemId]) -> bool {
        if items.len() != self.claim_size {
            return false;
        }
        let set: BTreeSet<ItemId> = items.iter().copied().collect();
        set.len() == items.len() && self.valid.contains(&set)
    }

    fn find_claims(&self, candidates: &[ItemId], limit: usize) -> Vec<Tuple> {
        self.valid
            .iter()
            .filter(|tuple| tuple.iter().all(|item| candidates.contains(item)))
            .take(limit)
            .map(|tuple| tuple.iter().copied().collect())
            .collect()
    }
}
