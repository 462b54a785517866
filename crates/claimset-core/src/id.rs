//! Strongly-typed identifiers and the [`Tuple`] type alias.

use smallvec::SmallVec;
use std::fmt;

/// Identifies a slot on the shared grid.
///
/// Slots are fixed at configuration time and numbered `0..grid_slots`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl SlotId {
    /// The slot number as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies an item of the pool.
///
/// Items are numbered `0..pool_size`. An item is either on the grid,
/// in the pool, or retired; never in two of those places at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u32);

impl ItemId {
    /// The item number as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ItemId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a participating agent.
///
/// Agents are registered at game start and assigned sequential IDs.
/// `AgentId(n)` corresponds to the n-th entry of the agent roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u32);

impl AgentId {
    /// The agent number as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AgentId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// An ordered tuple of items, as submitted to the validity predicate.
///
/// Claims are small (three items in the classic configuration), so the
/// inline capacity of 4 avoids heap allocation on the resolution path.
pub type Tuple = SmallVec<[ItemId; 4]>;
