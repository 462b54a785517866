//! Error types for the claimset engine.
//!
//! Organized by subsystem: grid mutation (dealer side) and marker
//! toggling (agent side). Neither crosses a thread boundary: callers
//! absorb them locally and log, per the engine's error model.

use std::error::Error;
use std::fmt;

use crate::id::{AgentId, ItemId, SlotId};

/// Errors from mutating the slot/item bijection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridError {
    /// The slot index is outside `0..grid_slots`.
    SlotOutOfRange {
        /// The offending slot.
        slot: SlotId,
    },
    /// The item index is outside `0..pool_size`.
    ItemOutOfRange {
        /// The offending item.
        item: ItemId,
    },
    /// Placing into a slot that already holds an item.
    SlotOccupied {
        /// The occupied slot.
        slot: SlotId,
        /// The item currently in it.
        occupant: ItemId,
    },
    /// Removing from a slot that holds nothing.
    SlotEmpty {
        /// The empty slot.
        slot: SlotId,
    },
    /// Placing an item that is already on the grid or retired.
    ItemUnavailable {
        /// The unavailable item.
        item: ItemId,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotOutOfRange { slot } => write!(f, "slot {slot} out of range"),
            Self::ItemOutOfRange { item } => write!(f, "item {item} out of range"),
            Self::SlotOccupied { slot, occupant } => {
                write!(f, "slot {slot} already holds item {occupant}")
            }
            Self::SlotEmpty { slot } => write!(f, "slot {slot} is empty"),
            Self::ItemUnavailable { item } => {
                write!(f, "item {item} is not in the pool")
            }
        }
    }
}

impl Error for GridError {}

/// Reasons a marker toggle was not applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleError {
    /// The agent is inside its freeze window.
    Frozen {
        /// The frozen agent.
        agent: AgentId,
    },
    /// No agent with this ID is registered.
    UnknownAgent {
        /// The unknown agent.
        agent: AgentId,
    },
    /// The slot index is outside `0..grid_slots`.
    SlotOutOfRange {
        /// The offending slot.
        slot: SlotId,
    },
    /// The slot holds no item, so there is nothing to mark.
    SlotEmpty {
        /// The empty slot.
        slot: SlotId,
    },
    /// The game is terminating; no further mutation is accepted.
    ShuttingDown,
}

impl fmt::Display for ToggleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frozen { agent } => write!(f, "agent {agent} is frozen"),
            Self::UnknownAgent { agent } => write!(f, "unknown agent {agent}"),
            Self::SlotOutOfRange { slot } => write!(f, "slot {slot} out of range"),
            Self::SlotEmpty { slot } => write!(f, "slot {slot} holds no item"),
            Self::ShuttingDown => write!(f, "game is shutting down"),
        }
    }
}

impl Error for ToggleError {}
