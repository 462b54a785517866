//! Per-agent marker arrays.
//!
//! A [`MarkerSet`] is a fixed-size ordered array with one entry per
//! marker an agent may hold. Each occupied entry remembers the item that
//! was in the slot when it was marked, so the arbiter can tell a marker
//! whose slot has since been emptied or refilled from a live one.

use claimset_core::{ItemId, SlotId};
use smallvec::SmallVec;

/// One marker: a slot and the item it held when marked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Marker {
    /// The marked slot.
    pub slot: SlotId,
    /// The item in `slot` at marking time.
    pub item: ItemId,
}

/// Fixed-capacity marker array. Empty entries are `None`.
///
/// # Invariant
///
/// No two occupied entries share a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerSet {
    entries: SmallVec<[Option<Marker>; 4]>,
}

impl MarkerSet {
    /// An empty set with `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: SmallVec::from_elem(None, capacity),
        }
    }

    /// Total number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of occupied entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Whether no entry is occupied.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// Whether every entry is occupied.
    pub fn is_full(&self) -> bool {
        self.entries.iter().all(Option::is_some)
    }

    /// Whether some entry marks `slot`.
    pub fn contains(&self, slot: SlotId) -> bool {
        self.get(slot).is_some()
    }

    /// The marker on `slot`, if any.
    pub fn get(&self, slot: SlotId) -> Option<Marker> {
        self.entries.iter().flatten().find(|m| m.slot == slot).copied()
    }

    /// Put `marker` into the first empty entry.
    ///
    /// Returns `false` (and changes nothing) if the set is full or the
    /// slot is already marked.
    pub fn insert(&mut self, marker: Marker) -> bool {
        if self.contains(marker.slot) {
            return false;
        }
        match self.entries.iter_mut().find(|e| e.is_none()) {
            Some(entry) => {
                *entry = Some(marker);
                true
            }
            None => false,
        }
    }

    /// Empty the entry marking `slot`. Removing an absent marker is a no-op.
    pub fn remove(&mut self, slot: SlotId) -> Option<Marker> {
        self.entries
            .iter_mut()
            .find(|e| e.is_some_and(|m| m.slot == slot))
            .and_then(Option::take)
    }

    /// Empty every entry, returning the markers that were present.
    pub fn clear(&mut self) -> SmallVec<[Marker; 4]> {
        self.entries.iter_mut().filter_map(Option::take).collect()
    }

    /// Empty the entries whose marker fails `keep`, returning them.
    pub fn retain(&mut self, mut keep: impl FnMut(&Marker) -> bool) -> SmallVec<[Marker; 4]> {
        let mut dropped = SmallVec::new();
        for entry in self.entries.iter_mut() {
            if let Some(marker) = *entry {
                if !keep(&marker) {
                    *entry = None;
                    dropped.push(marker);
                }
            }
        }
        dropped
    }

    /// Every entry in order, empty ones included.
    pub fn entries(&self) -> &[Option<Marker>] {
        &self.entries
    }

    /// Slots of the occupied entries, in entry order.
    pub fn slots(&self) -> SmallVec<[SlotId; 4]> {
        self.entries.iter().flatten().map(|m| m.slot).collect()
    }
}
