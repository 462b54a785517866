//! One-way display notifications.
//!
//! The engine never reads anything back from the view. Notifications
//! may be emitted while engine locks are held, so implementations must
//! return promptly and must not call back into the engine.

use std::time::Duration;

use crate::id::{AgentId, ItemId, SlotId};

/// A single display notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    /// An item was dealt into a slot.
    ItemPlaced {
        /// The dealt item.
        item: ItemId,
        /// The slot it now occupies.
        slot: SlotId,
    },
    /// A slot was emptied (item retired or returned to the pool).
    ItemRemoved {
        /// The emptied slot.
        slot: SlotId,
    },
    /// An agent placed a marker.
    MarkerPlaced {
        /// The marking agent.
        agent: AgentId,
        /// The marked slot.
        slot: SlotId,
    },
    /// An agent's marker was removed, by the agent or by the arbiter.
    MarkerRemoved {
        /// The owning agent.
        agent: AgentId,
        /// The unmarked slot.
        slot: SlotId,
    },
    /// Every marker of every agent was cleared (reshuffle).
    MarkersCleared,
    /// An agent's score changed.
    ScoreUpdated {
        /// The scoring agent.
        agent: AgentId,
        /// The new score.
        score: u32,
    },
    /// An agent's remaining freeze time changed. Zero means unfrozen.
    FreezeUpdated {
        /// The frozen agent.
        agent: AgentId,
        /// Time left in the freeze window.
        remaining: Duration,
    },
    /// The round timer changed.
    CountdownUpdated {
        /// Remaining millis (countdown mode) or elapsed millis (elapsed mode).
        millis: u64,
        /// Whether the countdown is inside its warning threshold.
        warning: bool,
    },
    /// The game ended; these agents share the top score.
    WinnersAnnounced {
        /// Every agent tied at the maximum score.
        winners: Vec<AgentId>,
    },
}

/// Receiver of display notifications.
pub trait GameView: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, event: ViewEvent);
}

/// A view that discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullView;

impl GameView for NullView {
    fn notify(&self, _event: ViewEvent) {}
}
