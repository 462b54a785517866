//! The arbiter: dealing, claim resolution, reshuffles, and game end.
//!
//! # Loop
//!
//! ```text
//!   deal()
//!   loop:
//!     display countdown
//!     select! ─┬─ claim enqueued ──▶ resolve(first), drain rest FIFO
//!              ├─ stop dropped   ──▶ external shutdown
//!              └─ timeout(min(tick, deadline))
//!     step(now): expired? reshuffle : replenish
//!                no claim in grid ∪ pool? game over
//!                no deadline and no claim on grid? reshuffle
//!   raise termination; wake and join each agent (reverse order)
//!   announce winners
//! ```
//!
//! The arbiter is the only writer of the grid. It never holds more than
//! one agent lock at a time, and always takes it before the grid lock.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use claimset_core::{AgentId, Combinatorics, ItemId, Outcome, SlotId, Tuple, ViewEvent};
use crossbeam_channel::{select, Receiver};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

use crate::agent;
use crate::config::GameConfig;
use crate::game::GameReport;
use crate::table::{lock, SharedGrid};
use crate::timer::Countdown;

/// Random redraw attempts before the deterministic fallback.
const REDEAL_ATTEMPTS: usize = 64;

/// Valid tuples the deterministic fallback inspects for one that fits.
const FIT_SEARCH_LIMIT: usize = 1024;

/// Result of one post-pass [`Arbiter::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundState {
    /// A valid claim is still possible somewhere.
    Running,
    /// No valid tuple exists in grid and pool together.
    GameOver,
}

enum Verdict {
    Ruined,
    Valid(SmallVec<[SlotId; 4]>),
    Invalid,
}

/// Dealer and claim resolver.
pub struct Arbiter {
    table: Arc<SharedGrid>,
    rules: Arc<dyn Combinatorics>,
    timer: Countdown,
    rng: ChaCha8Rng,
    point_freeze: Duration,
    penalty_freeze: Duration,
    tick: Duration,
    require_claim_on_deal: bool,
    hints: bool,
    rounds: u64,
    claims_resolved: u64,
}

impl Arbiter {
    /// An arbiter over `table`, seeded from `config.seed`.
    pub fn new(table: Arc<SharedGrid>, rules: Arc<dyn Combinatorics>, config: &GameConfig) -> Self {
        Self {
            table,
            rules,
            timer: Countdown::new(config.timer, Instant::now()),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            point_freeze: config.point_freeze,
            penalty_freeze: config.penalty_freeze,
            tick: config.tick,
            require_claim_on_deal: config.require_claim_on_deal,
            hints: config.hints,
            rounds: 1,
            claims_resolved: 0,
        }
    }

    /// The round timer.
    pub fn timer(&self) -> &Countdown {
        &self.timer
    }

    /// Rounds played so far, counting the current one.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Claims dequeued and resolved so far.
    pub fn claims_resolved(&self) -> u64 {
        self.claims_resolved
    }

    // ── Main loop ────────────────────────────────────────────────

    /// Run the game to completion, then join `agents` in reverse
    /// creation order.
    ///
    /// Returns early, without announcing winners, once the termination
    /// flag is raised or `stop` is disconnected.
    pub fn run(mut self, agents: Vec<JoinHandle<()>>, stop: Receiver<()>) -> GameReport {
        tracing::info!(agents = agents.len(), "game started");
        self.deal();
        let claims = self.table.claims().clone();
        let mut finished = false;

        loop {
            if self.table.is_terminated() {
                break;
            }
            let now = Instant::now();
            if let Some(event) = self.timer.display(now) {
                self.table.view().notify(event);
            }
            let wait = self.timer.next_wake(now, self.tick);

            select! {
                recv(claims) -> msg => {
                    if let Ok(agent) = msg {
                        self.resolve(agent);
                        if self.resolve_pending() == 0 {
                            self.table.prune_stale_markers();
                        }
                    }
                }
                recv(stop) -> _ => break,
                default(wait) => {}
            }

            if self.table.is_terminated() {
                break;
            }
            if self.step(Instant::now()) == RoundState::GameOver {
                finished = true;
                break;
            }
        }

        self.finish(agents, finished)
    }

    /// Post-pass bookkeeping: reshuffle on deadline or replenish empty
    /// slots, then decide whether the game can go on.
    pub fn step(&mut self, now: Instant) -> RoundState {
        if self.timer.expired(now) {
            tracing::info!(round = self.rounds, "countdown expired");
            self.reshuffle();
        } else {
            self.deal();
        }

        let in_play = self.table.with_grid(|g| g.items_in_play());
        if !self.rules.any_claim(&in_play) {
            tracing::info!(round = self.rounds, "no claim possible in grid or pool");
            return RoundState::GameOver;
        }

        if !self.timer.mode().has_deadline() {
            let on_grid = self.table.with_grid(|g| g.items_on_grid());
            if !self.rules.any_claim(&on_grid) {
                tracing::debug!(round = self.rounds, "no claim on grid");
                self.reshuffle();
            }
        }
        RoundState::Running
    }

    fn finish(self, agents: Vec<JoinHandle<()>>, finished: bool) -> GameReport {
        agent::stop_all(&self.table, agents);

        if finished {
            self.return_grid_to_pool();
        }
        let scores = self.table.scores();
        let winners = winners(&scores);
        if finished {
            tracing::info!(?winners, ?scores, "game over");
            self.table.view().notify(ViewEvent::WinnersAnnounced {
                winners: winners.clone(),
            });
        } else {
            tracing::info!(?scores, "game stopped");
        }

        GameReport {
            scores,
            winners,
            rounds: self.rounds,
            claims_resolved: self.claims_resolved,
            finished,
        }
    }

    // ── Claim resolution ─────────────────────────────────────────

    /// Resolve every queued claim in FIFO order. Returns how many were
    /// resolved.
    pub fn resolve_pending(&mut self) -> usize {
        let claims = self.table.claims().clone();
        let mut resolved = 0;
        while let Ok(agent) = claims.try_recv() {
            self.resolve(agent);
            resolved += 1;
        }
        if resolved > 0 {
            self.table.prune_stale_markers();
        }
        resolved
    }

    fn resolve(&mut self, agent: AgentId) {
        let Ok(cell) = self.table.cell(agent) else {
            tracing::warn!(%agent, "claim from unknown agent");
            return;
        };
        self.claims_resolved += 1;
        let mut record = lock(&cell.record);

        let verdict = {
            let grid = self.table.grid_mut();
            let mut items = Tuple::new();
            let mut slots = SmallVec::new();
            let mut ruined = false;
            for entry in record.markers.entries() {
                match entry {
                    Some(marker) if grid.item_at(marker.slot) == Some(marker.item) => {
                        items.push(marker.item);
                        slots.push(marker.slot);
                    }
                    _ => ruined = true,
                }
            }
            if ruined {
                Verdict::Ruined
            } else if self.rules.is_valid(&items) {
                Verdict::Valid(slots)
            } else {
                Verdict::Invalid
            }
        };

        match verdict {
            Verdict::Ruined => {
                tracing::debug!(%agent, outcome = %Outcome::None, "claim ruined");
                self.table.clear_record(agent, &mut record);
                self.table
                    .post_outcome(agent, &mut record, Outcome::None, Duration::ZERO);
            }
            Verdict::Valid(slots) => {
                tracing::info!(%agent, outcome = %Outcome::Point, ?slots, "claim accepted");
                for slot in slots {
                    if let Err(err) = self.table.remove_item(slot, true) {
                        tracing::warn!(%agent, %slot, %err, "retiring claimed item failed");
                    }
                }
                self.table.clear_record(agent, &mut record);
                self.table
                    .post_outcome(agent, &mut record, Outcome::Point, self.point_freeze);
            }
            Verdict::Invalid => {
                tracing::info!(%agent, outcome = %Outcome::Penalty, "claim rejected");
                self.table
                    .post_outcome(agent, &mut record, Outcome::Penalty, self.penalty_freeze);
            }
        }
    }

    // ── Dealing ──────────────────────────────────────────────────

    /// Fill empty slots from the pool. Returns how many items were placed.
    ///
    /// Slots stay empty once the pool is exhausted. Placing anything
    /// restarts the round timer.
    pub fn deal(&mut self) -> usize {
        let empty = self.table.with_grid(|g| g.empty_slots());
        if empty.is_empty() || self.table.with_grid(|g| g.pool_len()) == 0 {
            return 0;
        }

        let drawn = if self.require_claim_on_deal && !self.timer.mode().has_deadline() {
            self.draw_with_claim(empty.len())
        } else {
            let mut grid = self.table.grid_mut();
            empty
                .iter()
                .map_while(|_| grid.draw(&mut self.rng))
                .collect::<Vec<_>>()
        };

        let mut placed = 0;
        for (slot, item) in empty.into_iter().zip(drawn) {
            match self.table.place_drawn(item, slot) {
                Ok(()) => placed += 1,
                Err(err) => {
                    tracing::warn!(%slot, %item, %err, "placement failed");
                    self.table.grid_mut().restore(item);
                }
            }
        }

        if placed > 0 {
            tracing::debug!(placed, round = self.rounds, "dealt");
            self.timer.reset(Instant::now());
            if self.hints {
                for hint in self.table.hints(self.rules.as_ref()) {
                    tracing::info!(slots = ?hint.as_slice(), "hint");
                }
            }
        }
        placed
    }

    /// Draw up to `count` items such that the grid afterwards holds a
    /// valid claim, if any deal can achieve that.
    fn draw_with_claim(&mut self, count: usize) -> Vec<ItemId> {
        let claim_size = self.rules.claim_size();
        let mut grid = self.table.grid_mut();
        let on_grid = grid.items_on_grid();

        let feasible = on_grid.len() + grid.pool_len() >= claim_size
            && self.rules.any_claim(&grid.items_in_play());
        if feasible {
            for _ in 0..REDEAL_ATTEMPTS {
                let drawn: Vec<ItemId> = (0..count).map_while(|_| grid.draw(&mut self.rng)).collect();
                let mut candidates = on_grid.clone();
                candidates.extend_from_slice(&drawn);
                if self.rules.any_claim(&candidates) {
                    return drawn;
                }
                for &item in &drawn {
                    grid.restore(item);
                }
            }

            // A tuple whose pooled part fits into the empty slots. Any
            // tuple fits when a whole claim fits; otherwise grid items come
            // first in the candidates, so grid-heavy tuples surface early.
            let limit = if count >= claim_size { 1 } else { FIT_SEARCH_LIMIT };
            let fitting = self
                .rules
                .find_claims(&grid.items_in_play(), limit)
                .into_iter()
                .map(|tuple| -> SmallVec<[ItemId; 4]> {
                    tuple.into_iter().filter(|&i| grid.is_pooled(i)).collect()
                })
                .find(|pooled| pooled.len() <= count);
            if let Some(pooled) = fitting {
                let mut drawn: Vec<ItemId> = pooled.into_iter().filter(|&i| grid.take(i)).collect();
                while drawn.len() < count {
                    match grid.draw(&mut self.rng) {
                        Some(item) => drawn.push(item),
                        None => break,
                    }
                }
                return drawn;
            }
        }

        tracing::debug!("no dealable claim; dealing without one");
        (0..count).map_while(|_| grid.draw(&mut self.rng)).collect()
    }

    /// Return every grid item to the pool, clear all markers, and deal
    /// a fresh grid.
    pub fn reshuffle(&mut self) {
        self.return_grid_to_pool();
        self.table.clear_all_markers();
        self.rounds += 1;
        tracing::info!(round = self.rounds, "reshuffled");
        self.deal();
        self.timer.reset(Instant::now());
    }

    fn return_grid_to_pool(&self) {
        let occupied: Vec<SlotId> = self
            .table
            .with_grid(|g| g.occupied().map(|(slot, _)| slot).collect());
        for slot in occupied {
            if let Err(err) = self.table.remove_item(slot, false) {
                tracing::warn!(%slot, %err, "returning item to pool failed");
            }
        }
    }
}

impl std::fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arbiter")
            .field("timer", &self.timer)
            .field("rounds", &self.rounds)
            .field("claims_resolved", &self.claims_resolved)
            .finish_non_exhaustive()
    }
}

/// Every agent tied at the maximum score, in ID order.
pub fn winners(scores: &[u32]) -> Vec<AgentId> {
    let Some(&best) = scores.iter().max() else {
        return Vec::new();
    };
    scores
        .iter()
        .enumerate()
        .filter(|&(_, &score)| score == best)
        .map(|(index, _)| AgentId(index as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimerMode;
    use claimset_core::NullView;
    use claimset_rules::FeatureRules;

    fn setup(config: &GameConfig) -> (Arc<SharedGrid>, Arbiter) {
        setup_with(config, FeatureRules::classic())
    }

    fn setup_with(config: &GameConfig, rules: FeatureRules) -> (Arc<SharedGrid>, Arbiter) {
        let table = Arc::new(SharedGrid::new(
            config.grid_slots,
            config.pool_size,
            config.agent_count(),
            config.claim_size,
            Duration::ZERO,
            Arc::new(NullView),
        ));
        let arbiter = Arbiter::new(Arc::clone(&table), Arc::new(rules), config);
        (table, arbiter)
    }

    fn fast_config() -> GameConfig {
        GameConfig {
            placement_delay: Duration::ZERO,
            ..GameConfig::default()
        }
    }

    // ── winners tests ────────────────────────────────────────────

    #[test]
    fn winners_include_every_tie() {
        assert_eq!(winners(&[2, 5, 5, 1]), vec![AgentId(1), AgentId(2)]);
        assert_eq!(winners(&[0, 0]), vec![AgentId(0), AgentId(1)]);
        assert!(winners(&[]).is_empty());
    }

    // ── Dealing tests ────────────────────────────────────────────

    #[test]
    fn deal_fills_every_empty_slot() {
        let config = fast_config();
        let (table, mut arbiter) = setup(&config);
        assert_eq!(arbiter.deal(), 12);
        assert_eq!(table.item_count(), 12);
        assert_eq!(arbiter.deal(), 0);
        assert!(table.with_grid(|g| g.is_consistent()));
    }

    #[test]
    fn deal_leaves_slots_empty_when_pool_runs_out() {
        let config = GameConfig {
            pool_size: 5,
            ..fast_config()
        };
        let (table, mut arbiter) = setup(&config);
        assert_eq!(arbiter.deal(), 5);
        assert_eq!(table.item_count(), 5);
        assert_eq!(table.with_grid(|g| g.pool_len()), 0);
    }

    #[test]
    fn same_seed_deals_same_grid() {
        let config = fast_config();
        let (a, mut arb_a) = setup(&config);
        let (b, mut arb_b) = setup(&config);
        arb_a.deal();
        arb_b.deal();
        assert_eq!(
            a.with_grid(|g| g.items_on_grid()),
            b.with_grid(|g| g.items_on_grid())
        );
    }

    #[test]
    fn required_claim_deal_produces_a_claim() {
        let config = GameConfig {
            timer: TimerMode::Disabled,
            require_claim_on_deal: true,
            grid_slots: 3,
            ..fast_config()
        };
        let rules = FeatureRules::classic();
        for seed in 0..8 {
            let config = GameConfig { seed, ..config.clone() };
            let (table, mut arbiter) = setup(&config);
            arbiter.deal();
            assert!(rules.any_claim(&table.with_grid(|g| g.items_on_grid())));
        }
    }

    #[test]
    fn required_claim_deal_stays_bounded_on_a_large_pool() {
        // Five features of four values: 1024 items, claims of four. Random
        // quadruples are almost never valid, so the fitting search runs.
        let rules = FeatureRules::new(5, 4).unwrap();
        let config = GameConfig {
            claim_size: 4,
            pool_size: rules.pool_size(),
            grid_slots: 4,
            timer: TimerMode::Disabled,
            require_claim_on_deal: true,
            ..fast_config()
        };
        let (table, mut arbiter) = setup_with(&config, rules.clone());
        assert_eq!(arbiter.deal(), 4);
        assert!(rules.any_claim(&table.with_grid(|g| g.items_on_grid())));
        assert!(table.with_grid(|g| g.is_consistent()));
    }

    #[test]
    fn reshuffle_returns_items_and_counts_round() {
        let config = fast_config();
        let (table, mut arbiter) = setup(&config);
        arbiter.deal();
        arbiter.reshuffle();
        assert_eq!(arbiter.rounds(), 2);
        assert_eq!(table.item_count(), 12);
        assert!(table.with_grid(|g| g.retired().is_empty()));
        assert!(table.with_grid(|g| g.is_consistent()));
    }

    #[test]
    fn step_reports_game_over_without_any_claim() {
        // Items 0, 1, 3, 4 admit no valid triple under the classic rules.
        let config = GameConfig {
            pool_size: 81,
            ..fast_config()
        };
        let (table, mut arbiter) = setup(&config);
        for item in (0..81).filter(|i| ![0, 1, 3, 4].contains(i)) {
            let slot = table.with_grid(|g| g.empty_slots()[0]);
            table.place_item(ItemId(item), slot).unwrap();
            table.remove_item(slot, true).unwrap();
        }
        assert_eq!(arbiter.step(Instant::now()), RoundState::GameOver);
    }
}
