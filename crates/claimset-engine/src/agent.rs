//! Agent threads.
//!
//! Every agent runs a main thread that consumes claim outcomes and
//! counts down its freeze window. A human agent's main thread also
//! applies toggle requests from its inbox; an autonomous agent instead
//! spawns a helper thread that picks slots at random and joins it
//! before exiting.

use std::io;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use claimset_core::{AgentId, SlotId, ViewEvent};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::AgentKind;
use crate::table::{lock, AgentCell, AgentRecord, SharedGrid, Toggle};

/// Longest single step of the freeze display countdown.
const FREEZE_DISPLAY_STEP: Duration = Duration::from_secs(1);

/// Seed of agent `id`'s slot picker, derived from the game seed.
pub(crate) fn agent_seed(game_seed: u64, id: AgentId) -> u64 {
    game_seed ^ (u64::from(id.0) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Spawn the main thread of agent `id`.
pub(crate) fn spawn(
    id: AgentId,
    kind: AgentKind,
    table: Arc<SharedGrid>,
    retry: Duration,
    seed: u64,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("claimset-agent-{id}"))
        .spawn(move || {
            let agent = Agent { id, table, retry };
            match kind {
                AgentKind::Human => agent.run_human(),
                AgentKind::Autonomous => agent.run_autonomous(seed),
            }
        })
}

/// Raise the termination flag, then wake and join each agent in reverse
/// creation order. `agents[i]` must be agent `i`'s main thread.
pub(crate) fn stop_all(table: &SharedGrid, agents: Vec<JoinHandle<()>>) {
    table.raise_termination();
    for (index, handle) in agents.into_iter().enumerate().rev() {
        let id = AgentId(index as u32);
        table.wake(id);
        if handle.join().is_err() {
            tracing::warn!(agent = %id, "agent thread panicked");
        }
    }
}

fn wait<'a>(cell: &AgentCell, guard: MutexGuard<'a, AgentRecord>) -> MutexGuard<'a, AgentRecord> {
    cell.signal.wait(guard).unwrap_or_else(PoisonError::into_inner)
}

fn wait_for<'a>(
    cell: &AgentCell,
    guard: MutexGuard<'a, AgentRecord>,
    timeout: Duration,
) -> MutexGuard<'a, AgentRecord> {
    match cell.signal.wait_timeout(guard, timeout) {
        Ok((guard, _)) => guard,
        Err(poisoned) => poisoned.into_inner().0,
    }
}

struct Agent {
    id: AgentId,
    table: Arc<SharedGrid>,
    retry: Duration,
}

impl Agent {
    // ── Human ────────────────────────────────────────────────────

    fn run_human(self) {
        let Ok(cell) = self.table.cell(self.id) else {
            return;
        };
        tracing::debug!(agent = %self.id, "human agent started");
        loop {
            let mut record = lock(&cell.record);
            while record.inbox.is_empty()
                && record.pending.is_none()
                && !self.table.is_terminated()
            {
                record = wait(cell, record);
            }
            if record.pending.is_some() {
                drop(record);
                self.consume_outcome(cell);
                continue;
            }
            if self.table.is_terminated() {
                break;
            }
            let Some(slot) = record.inbox.pop_front() else {
                continue;
            };
            drop(record);
            self.toggle(slot);
        }
        self.consume_outcome(cell);
        tracing::debug!(agent = %self.id, "human agent stopped");
    }

    fn toggle(&self, slot: SlotId) {
        match self.table.toggle_marker(self.id, slot) {
            Ok(effect) => tracing::trace!(agent = %self.id, %slot, ?effect, "toggled"),
            Err(err) => tracing::debug!(agent = %self.id, %slot, %err, "toggle rejected"),
        }
    }

    // ── Autonomous ───────────────────────────────────────────────

    fn run_autonomous(self, seed: u64) {
        let Ok(cell) = self.table.cell(self.id) else {
            return;
        };
        tracing::debug!(agent = %self.id, "autonomous agent started");
        let helper = {
            let table = Arc::clone(&self.table);
            let (id, retry) = (self.id, self.retry);
            thread::Builder::new()
                .name(format!("claimset-auto-{id}"))
                .spawn(move || pick_loop(id, &table, retry, ChaCha8Rng::seed_from_u64(seed)))
        };
        let helper = match helper {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(agent = %self.id, %err, "slot picker failed to start");
                None
            }
        };

        loop {
            let mut record = lock(&cell.record);
            while record.pending.is_none() && !self.table.is_terminated() {
                record = wait(cell, record);
            }
            let stop = record.pending.is_none();
            drop(record);
            if stop {
                break;
            }
            self.consume_outcome(cell);
        }

        if let Some(handle) = helper {
            if handle.join().is_err() {
                tracing::warn!(agent = %self.id, "slot picker panicked");
            }
        }
        self.consume_outcome(cell);
        tracing::debug!(agent = %self.id, "autonomous agent stopped");
    }

    // ── Outcomes ─────────────────────────────────────────────────

    /// Apply a pending outcome, then count down the freeze it started.
    fn consume_outcome(&self, cell: &AgentCell) {
        let Some(outcome) = self.table.take_outcome(self.id) else {
            return;
        };
        tracing::debug!(agent = %self.id, %outcome, "outcome consumed");
        if outcome.freezes() {
            self.freeze_countdown(cell);
        }
    }

    fn freeze_countdown(&self, cell: &AgentCell) {
        let view = self.table.view();
        let mut record = lock(&cell.record);
        record.inbox.clear();
        loop {
            if self.table.is_terminated() {
                break;
            }
            let now = Instant::now();
            let Some(until) = record.freeze_until.filter(|&until| until > now) else {
                break;
            };
            let remaining = until - now;
            view.notify(ViewEvent::FreezeUpdated {
                agent: self.id,
                remaining,
            });
            record = wait_for(cell, record, remaining.min(FREEZE_DISPLAY_STEP));
        }
        view.notify(ViewEvent::FreezeUpdated {
            agent: self.id,
            remaining: Duration::ZERO,
        });
    }
}

/// The autonomous helper: clear leftovers, mark random occupied slots,
/// wait for the verdict, repeat.
fn pick_loop(id: AgentId, table: &SharedGrid, retry: Duration, mut rng: ChaCha8Rng) {
    let Ok(cell) = table.cell(id) else {
        return;
    };
    let claim_size = table.claim_size();

    while !table.is_terminated() {
        // Sit out any freeze and any outcome the main thread has not
        // consumed yet.
        let before = {
            let mut record = lock(&cell.record);
            loop {
                if table.is_terminated() {
                    return;
                }
                let now = Instant::now();
                let frozen_for = record
                    .freeze_until
                    .filter(|&until| until > now)
                    .map(|until| until - now);
                match (frozen_for, record.pending) {
                    (None, None) => break,
                    (Some(left), _) => record = wait_for(cell, record, left),
                    (None, Some(_)) => record = wait_for(cell, record, retry),
                }
            }
            record.resolutions
        };

        table.clear_markers(id);
        let occupied: Vec<SlotId> = table.with_grid(|g| g.occupied().map(|(s, _)| s).collect());
        let mut claimed = false;
        if occupied.len() >= claim_size {
            for index in rand::seq::index::sample(&mut rng, occupied.len(), claim_size) {
                match table.toggle_marker(id, occupied[index]) {
                    Ok(Toggle::Claimed | Toggle::Completed) => claimed = true,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::trace!(agent = %id, %err, "pick abandoned");
                        break;
                    }
                }
            }
        }

        let mut record = lock(&cell.record);
        if claimed {
            while record.resolutions == before && !table.is_terminated() {
                record = wait(cell, record);
            }
        } else if !table.is_terminated() {
            drop(wait_for(cell, record, retry));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimset_core::{ItemId, NullView, Outcome};

    fn table(agents: usize) -> Arc<SharedGrid> {
        Arc::new(SharedGrid::new(
            6,
            6,
            agents,
            3,
            Duration::ZERO,
            Arc::new(NullView),
        ))
    }

    #[test]
    fn agent_seeds_differ_per_agent() {
        assert_ne!(agent_seed(7, AgentId(0)), agent_seed(7, AgentId(1)));
        assert_eq!(agent_seed(7, AgentId(3)), agent_seed(7, AgentId(3)));
    }

    #[test]
    fn human_applies_inbox_then_stops_on_terminate() {
        let table = table(1);
        table.place_item(ItemId(0), SlotId(0)).unwrap();
        let handle = spawn(
            AgentId(0),
            AgentKind::Human,
            Arc::clone(&table),
            Duration::from_millis(5),
            0,
        )
        .unwrap();
        table.request_toggle(AgentId(0), SlotId(0)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while table.markers(AgentId(0)).is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(table.markers(AgentId(0)).as_slice(), &[SlotId(0)]);
        table.terminate();
        handle.join().unwrap();
    }

    #[test]
    fn pending_point_is_counted_before_exit() {
        let table = table(1);
        let handle = spawn(
            AgentId(0),
            AgentKind::Human,
            Arc::clone(&table),
            Duration::from_millis(5),
            0,
        )
        .unwrap();
        {
            let cell = table.cell(AgentId(0)).unwrap();
            let mut record = lock(&cell.record);
            table.post_outcome(AgentId(0), &mut record, Outcome::Point, Duration::ZERO);
        }
        table.terminate();
        handle.join().unwrap();
        assert_eq!(table.score(AgentId(0)), 1);
        assert_eq!(table.pending_outcome(AgentId(0)), None);
    }

    #[test]
    fn autonomous_agent_completes_a_marker_set() {
        let table = table(1);
        for s in 0..6 {
            table.place_item(ItemId(s), SlotId(s)).unwrap();
        }
        let handle = spawn(
            AgentId(0),
            AgentKind::Autonomous,
            Arc::clone(&table),
            Duration::from_millis(5),
            42,
        )
        .unwrap();
        let claim = table
            .claims()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(claim, AgentId(0));
        assert_eq!(table.markers(AgentId(0)).len(), 3);
        table.terminate();
        handle.join().unwrap();
    }

    #[test]
    fn autonomous_agent_idles_on_a_sparse_grid() {
        // Two items for a three-item claim: the picker never claims and
        // keeps waiting out the retry interval.
        let table = table(1);
        table.place_item(ItemId(0), SlotId(0)).unwrap();
        table.place_item(ItemId(1), SlotId(1)).unwrap();
        let handle = spawn(
            AgentId(0),
            AgentKind::Autonomous,
            Arc::clone(&table),
            Duration::from_millis(2),
            3,
        )
        .unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(table.claims().is_empty());
        assert!(table.markers(AgentId(0)).is_empty());
        table.terminate();
        handle.join().unwrap();
    }

    #[test]
    fn stop_all_wakes_and_joins_in_reverse_order() {
        use std::sync::Mutex;

        let table = table(3);
        let exits = Arc::new(Mutex::new(Vec::new()));
        let agents: Vec<JoinHandle<()>> = (0..3)
            .map(|index| {
                let table = Arc::clone(&table);
                let exits = Arc::clone(&exits);
                thread::spawn(move || {
                    let cell = table.cell(AgentId(index)).unwrap();
                    let mut record = lock(&cell.record);
                    // Score 1 marks "waiting"; it is set under the same
                    // lock the wait releases.
                    record.score = 1;
                    while !table.is_terminated() {
                        record = wait(cell, record);
                    }
                    drop(record);
                    exits.lock().unwrap().push(index);
                })
            })
            .collect();
        let deadline = Instant::now() + Duration::from_secs(5);
        while table.scores() != vec![1, 1, 1] && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        stop_all(&table, agents);
        assert_eq!(*exits.lock().unwrap(), vec![2, 1, 0]);
    }
}
