//! The shared grid: bijection, per-agent records, and the claim queue.
//!
//! # Locking
//!
//! ```text
//!   agent record lock (one per agent)   ──▶   grid lock   (never the reverse)
//!   agent record lock                   ──▶   claim channel send
//! ```
//!
//! No thread ever holds two agent record locks at once. The arbiter is
//! the only thread that places or removes items; agents only touch their
//! own marker arrays. A claim is enqueued by the same critical section
//! that fills the last marker entry, so completion and enqueue are one
//! atomic step with respect to concurrent un-marking.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use claimset_core::{
    AgentId, Combinatorics, GameView, GridError, ItemId, Outcome, SlotId, ToggleError, ViewEvent,
};
use crossbeam_channel::{Receiver, Sender};
use smallvec::SmallVec;

use crate::grid::GridState;
use crate::markers::{Marker, MarkerSet};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── AgentRecord ──────────────────────────────────────────────────

/// Mutable per-agent state, guarded by the agent's own lock.
#[derive(Debug)]
pub(crate) struct AgentRecord {
    pub markers: MarkerSet,
    /// Marker mutation is rejected while `now < freeze_until`.
    pub freeze_until: Option<Instant>,
    /// Single-slot mailbox. `Some` from posting until the agent consumes it.
    pub pending: Option<Outcome>,
    /// Bumped on every posted outcome; lets waiters detect a resolution
    /// even if another thread already emptied the mailbox.
    pub resolutions: u64,
    /// True from enqueue until the arbiter dequeues and resolves.
    pub claim_pending: bool,
    pub score: u32,
    /// Toggle requests delivered by the input source (human agents).
    pub inbox: VecDeque<SlotId>,
}

impl AgentRecord {
    fn new(claim_size: usize) -> Self {
        Self {
            markers: MarkerSet::new(claim_size),
            freeze_until: None,
            pending: None,
            resolutions: 0,
            claim_pending: false,
            score: 0,
            inbox: VecDeque::new(),
        }
    }

    pub fn is_frozen(&self, now: Instant) -> bool {
        self.freeze_until.is_some_and(|until| now < until)
    }
}

/// An agent record with its wait condition.
#[derive(Debug)]
pub(crate) struct AgentCell {
    pub record: Mutex<AgentRecord>,
    pub signal: Condvar,
}

// ── Toggle ───────────────────────────────────────────────────────

/// Effect of an accepted [`SharedGrid::toggle_marker`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    /// A marker was placed; the set is not yet complete.
    Placed,
    /// A marker was placed and completed the set; a claim was enqueued.
    Claimed,
    /// A marker was placed and completed the set while an earlier claim
    /// from this agent is still queued; that entry will resolve it.
    Completed,
    /// The existing marker on the slot was removed.
    Removed,
    /// The set is full; nothing changed.
    Full,
}

// ── SharedGrid ───────────────────────────────────────────────────

/// Grid, pool, per-agent records, and the FIFO claim queue.
pub struct SharedGrid {
    grid: Mutex<GridState>,
    agents: Box<[AgentCell]>,
    claims_tx: Sender<AgentId>,
    claims_rx: Receiver<AgentId>,
    terminate: AtomicBool,
    claim_size: usize,
    placement_delay: Duration,
    view: Arc<dyn GameView>,
}

// Compile-time assertion: SharedGrid is shared across every game thread.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SharedGrid>();
};

impl SharedGrid {
    /// Create an empty grid of `slots` slots with items `0..pool_size`
    /// pooled, and one record per agent.
    pub fn new(
        slots: u32,
        pool_size: u32,
        agent_count: usize,
        claim_size: usize,
        placement_delay: Duration,
        view: Arc<dyn GameView>,
    ) -> Self {
        let agents = (0..agent_count)
            .map(|_| AgentCell {
                record: Mutex::new(AgentRecord::new(claim_size)),
                signal: Condvar::new(),
            })
            .collect();
        let (claims_tx, claims_rx) = crossbeam_channel::unbounded();
        Self {
            grid: Mutex::new(GridState::new(slots, pool_size)),
            agents,
            claims_tx,
            claims_rx,
            terminate: AtomicBool::new(false),
            claim_size,
            placement_delay,
            view,
        }
    }

    /// Markers per claim.
    pub fn claim_size(&self) -> usize {
        self.claim_size
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Number of grid slots.
    pub fn slot_count(&self) -> usize {
        lock(&self.grid).slot_count()
    }

    /// The display sink.
    pub fn view(&self) -> &dyn GameView {
        self.view.as_ref()
    }

    // ── Grid mutation (arbiter side) ─────────────────────────────

    /// Move the pooled `item` into the empty `slot`.
    pub fn place_item(&self, item: ItemId, slot: SlotId) -> Result<(), GridError> {
        self.pause();
        lock(&self.grid).place(item, slot)?;
        self.view.notify(ViewEvent::ItemPlaced { item, slot });
        Ok(())
    }

    /// Place an item already drawn out of the pool.
    pub(crate) fn place_drawn(&self, item: ItemId, slot: SlotId) -> Result<(), GridError> {
        self.pause();
        lock(&self.grid).place_drawn(item, slot)?;
        self.view.notify(ViewEvent::ItemPlaced { item, slot });
        Ok(())
    }

    /// Empty `slot`. With `retire == false` the item goes back to the
    /// pool; otherwise it leaves circulation for good.
    pub fn remove_item(&self, slot: SlotId, retire: bool) -> Result<ItemId, GridError> {
        self.pause();
        let item = lock(&self.grid).remove(slot, retire)?;
        self.view.notify(ViewEvent::ItemRemoved { slot });
        Ok(item)
    }

    fn pause(&self) {
        if !self.placement_delay.is_zero() {
            std::thread::sleep(self.placement_delay);
        }
    }

    /// Run `f` with the grid locked.
    pub fn with_grid<R>(&self, f: impl FnOnce(&GridState) -> R) -> R {
        f(&lock(&self.grid))
    }

    pub(crate) fn grid_mut(&self) -> MutexGuard<'_, GridState> {
        lock(&self.grid)
    }

    /// Number of occupied slots.
    pub fn item_count(&self) -> usize {
        lock(&self.grid).item_count()
    }

    /// Every valid tuple currently on the grid, as sorted slot lists.
    pub fn hints(&self, rules: &dyn Combinatorics) -> Vec<SmallVec<[SlotId; 4]>> {
        let grid = lock(&self.grid);
        rules
            .find_claims(&grid.items_on_grid(), usize::MAX)
            .into_iter()
            .map(|tuple| {
                let mut slots: SmallVec<[SlotId; 4]> =
                    tuple.iter().filter_map(|&i| grid.slot_of(i)).collect();
                slots.sort();
                slots
            })
            .collect()
    }

    // ── Markers (agent side) ─────────────────────────────────────

    /// Toggle `agent`'s marker on `slot`.
    ///
    /// Removes the marker if present; otherwise places one on the item
    /// currently in `slot`, provided the set is not full. Filling the
    /// last entry enqueues a claim and wakes the arbiter, unless a claim
    /// from this agent is already queued.
    pub fn toggle_marker(&self, agent: AgentId, slot: SlotId) -> Result<Toggle, ToggleError> {
        let cell = self.cell(agent)?;
        let mut record = lock(&cell.record);
        if self.is_terminated() {
            return Err(ToggleError::ShuttingDown);
        }
        if record.is_frozen(Instant::now()) {
            return Err(ToggleError::Frozen { agent });
        }
        if record.markers.remove(slot).is_some() {
            self.view.notify(ViewEvent::MarkerRemoved { agent, slot });
            return Ok(Toggle::Removed);
        }
        if record.markers.is_full() {
            return Ok(Toggle::Full);
        }
        let item = {
            let grid = lock(&self.grid);
            if slot.index() >= grid.slot_count() {
                return Err(ToggleError::SlotOutOfRange { slot });
            }
            grid.item_at(slot).ok_or(ToggleError::SlotEmpty { slot })?
        };
        record.markers.insert(Marker { slot, item });
        self.view.notify(ViewEvent::MarkerPlaced { agent, slot });

        if !record.markers.is_full() {
            return Ok(Toggle::Placed);
        }
        if record.claim_pending {
            return Ok(Toggle::Completed);
        }
        record.claim_pending = true;
        // The receiver lives in `self`, so the channel cannot be disconnected.
        let _ = self.claims_tx.send(agent);
        tracing::debug!(%agent, "claim enqueued");
        Ok(Toggle::Claimed)
    }

    /// Remove every marker of `agent`. Idempotent.
    pub fn clear_markers(&self, agent: AgentId) {
        let Ok(cell) = self.cell(agent) else {
            return;
        };
        let mut record = lock(&cell.record);
        self.clear_record(agent, &mut record);
    }

    pub(crate) fn clear_record(&self, agent: AgentId, record: &mut AgentRecord) {
        for marker in record.markers.clear() {
            self.view.notify(ViewEvent::MarkerRemoved {
                agent,
                slot: marker.slot,
            });
        }
    }

    /// Clear every agent's markers.
    pub fn clear_all_markers(&self) {
        for cell in self.agents.iter() {
            lock(&cell.record).markers.clear();
        }
        self.view.notify(ViewEvent::MarkersCleared);
    }

    /// Drop markers whose slot no longer holds the item they were placed
    /// on, for every agent.
    pub fn prune_stale_markers(&self) {
        for (index, cell) in self.agents.iter().enumerate() {
            let agent = AgentId(index as u32);
            let mut record = lock(&cell.record);
            let dropped = {
                let grid = lock(&self.grid);
                record.markers.retain(|m| grid.item_at(m.slot) == Some(m.item))
            };
            for marker in dropped {
                self.view.notify(ViewEvent::MarkerRemoved {
                    agent,
                    slot: marker.slot,
                });
            }
        }
    }

    /// Slots currently marked by `agent`, in entry order.
    pub fn markers(&self, agent: AgentId) -> SmallVec<[SlotId; 4]> {
        self.cell(agent)
            .map(|cell| lock(&cell.record).markers.slots())
            .unwrap_or_default()
    }

    // ── Input delivery ───────────────────────────────────────────

    /// Deliver an external toggle request to `agent`'s inbox and wake it.
    ///
    /// Requests arriving while the agent is frozen are dropped.
    pub fn request_toggle(&self, agent: AgentId, slot: SlotId) -> Result<(), ToggleError> {
        let cell = self.cell(agent)?;
        let mut record = lock(&cell.record);
        if self.is_terminated() {
            return Err(ToggleError::ShuttingDown);
        }
        if record.is_frozen(Instant::now()) {
            return Err(ToggleError::Frozen { agent });
        }
        record.inbox.push_back(slot);
        cell.signal.notify_all();
        Ok(())
    }

    // ── Outcomes and freeze ──────────────────────────────────────

    /// Post `outcome` to `agent`'s mailbox, start the matching freeze
    /// window, and wake the agent. Called with the record already locked.
    pub(crate) fn post_outcome(
        &self,
        agent: AgentId,
        record: &mut AgentRecord,
        outcome: Outcome,
        freeze: Duration,
    ) {
        record.pending = Some(outcome);
        record.resolutions += 1;
        record.claim_pending = false;
        if outcome.freezes() {
            record.freeze_until = Some(Instant::now() + freeze);
        }
        if let Ok(cell) = self.cell(agent) {
            cell.signal.notify_all();
        }
    }

    /// Take `agent`'s pending outcome, applying its score effect.
    ///
    /// Returns `None` if the mailbox is empty.
    pub fn take_outcome(&self, agent: AgentId) -> Option<Outcome> {
        let cell = self.cell(agent).ok()?;
        let mut record = lock(&cell.record);
        let outcome = record.pending.take()?;
        if outcome == Outcome::Point {
            record.score += 1;
            self.view.notify(ViewEvent::ScoreUpdated {
                agent,
                score: record.score,
            });
        }
        Some(outcome)
    }

    /// The outcome waiting in `agent`'s mailbox, without consuming it.
    pub fn pending_outcome(&self, agent: AgentId) -> Option<Outcome> {
        self.cell(agent).ok().and_then(|c| lock(&c.record).pending)
    }

    /// End of `agent`'s current freeze window, if one was ever set.
    pub fn freeze_until(&self, agent: AgentId) -> Option<Instant> {
        self.cell(agent).ok().and_then(|c| lock(&c.record).freeze_until)
    }

    /// Whether `agent` is frozen right now.
    pub fn is_frozen(&self, agent: AgentId) -> bool {
        self.cell(agent)
            .is_ok_and(|c| lock(&c.record).is_frozen(Instant::now()))
    }

    /// `agent`'s score.
    pub fn score(&self, agent: AgentId) -> u32 {
        self.cell(agent).map_or(0, |c| lock(&c.record).score)
    }

    /// Every agent's score, indexed by agent ID.
    pub fn scores(&self) -> Vec<u32> {
        self.agents.iter().map(|c| lock(&c.record).score).collect()
    }

    // ── Termination ──────────────────────────────────────────────

    /// Raise the global termination flag and wake every agent.
    pub fn terminate(&self) {
        self.raise_termination();
        for index in 0..self.agents.len() {
            self.wake(AgentId(index as u32));
        }
    }

    /// Raise the termination flag without waking anyone. Agents notice
    /// it at their next wake-up.
    pub(crate) fn raise_termination(&self) {
        self.terminate.store(true, Ordering::Release);
    }

    /// Wake every thread waiting on `agent`'s record.
    pub(crate) fn wake(&self, agent: AgentId) {
        if let Ok(cell) = self.cell(agent) {
            // Notify under the lock so a waiter between its flag check
            // and its wait cannot miss the wake-up.
            let _guard = lock(&cell.record);
            cell.signal.notify_all();
        }
    }

    /// Whether termination was requested.
    pub fn is_terminated(&self) -> bool {
        self.terminate.load(Ordering::Acquire)
    }

    // ── Internals ────────────────────────────────────────────────

    pub(crate) fn cell(&self, agent: AgentId) -> Result<&AgentCell, ToggleError> {
        self.agents
            .get(agent.index())
            .ok_or(ToggleError::UnknownAgent { agent })
    }

    pub(crate) fn claims(&self) -> &Receiver<AgentId> {
        &self.claims_rx
    }
}

impl std::fmt::Debug for SharedGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedGrid")
            .field("agents", &self.agents.len())
            .field("claim_size", &self.claim_size)
            .field("queued_claims", &self.claims_rx.len())
            .finish()
    }
}
