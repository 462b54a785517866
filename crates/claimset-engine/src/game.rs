//! User-facing `Game` API and thread lifecycle.
//!
//! # Architecture
//!
//! ```text
//! Input source            Agent threads (N)            Arbiter thread
//!     |                        |                            |
//!     |--press(slot)---------->| inbox → toggle_marker()    |
//!     |                        |--claim id [unbounded]----->| select! claims / stop / tick
//!     |                        |                            | resolve FIFO, post outcome
//!     |                        |<--notify_all---------------|
//!     |                        | take_outcome(), freeze     |
//!     |                        |                            | game over: raise flag,
//!     |                        |<--wake + join (reverse)----|   then winners
//! ```
//!
//! Autonomous agents run one more helper thread each, joined by their
//! own main thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use claimset_core::{AgentId, Combinatorics, GameView, SlotId, ToggleError};
use crossbeam_channel::Sender;

use crate::agent;
use crate::arbiter::{winners, Arbiter};
use crate::config::{AgentKind, ConfigError, GameConfig};
use crate::table::SharedGrid;

// ── GameReport ───────────────────────────────────────────────────

/// Final tally of a game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameReport {
    /// Score per agent, indexed by agent ID.
    pub scores: Vec<u32>,
    /// Every agent tied at the top score.
    pub winners: Vec<AgentId>,
    /// Rounds played, counting the initial deal as round one.
    pub rounds: u64,
    /// Claims dequeued and resolved by the arbiter.
    pub claims_resolved: u64,
    /// `true` if the game ran out of possible claims; `false` if it was
    /// stopped from outside.
    pub finished: bool,
}

// ── InputHandle ──────────────────────────────────────────────────

/// Delivers toggle requests to one human agent.
#[derive(Clone)]
pub struct InputHandle {
    table: Arc<SharedGrid>,
    agent: AgentId,
}

impl InputHandle {
    /// The agent this handle addresses.
    pub fn agent(&self) -> AgentId {
        self.agent
    }

    /// Ask the agent to toggle its marker on `slot`.
    ///
    /// Requests made while the agent is frozen are dropped and reported
    /// as [`ToggleError::Frozen`].
    pub fn press(&self, slot: SlotId) -> Result<(), ToggleError> {
        self.table.request_toggle(self.agent, slot)
    }
}

impl std::fmt::Debug for InputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputHandle")
            .field("agent", &self.agent)
            .finish()
    }
}

// ── LifecycleState ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Running,
    Stopped,
}

// ── Game ─────────────────────────────────────────────────────────

/// A running game: one arbiter thread plus the agent threads.
///
/// Dropping a running game stops it and joins every thread.
pub struct Game {
    table: Arc<SharedGrid>,
    kinds: Vec<AgentKind>,
    stop_tx: Option<Sender<()>>,
    arbiter: Option<JoinHandle<GameReport>>,
    report: Option<GameReport>,
    state: LifecycleState,
}

impl Game {
    /// Validate `config`, then spawn the agent threads and the arbiter.
    ///
    /// Agents are spawned first, in ID order; the arbiter owns their
    /// handles and joins them in reverse order when the game ends.
    pub fn start(
        config: GameConfig,
        rules: Arc<dyn Combinatorics>,
        view: Arc<dyn GameView>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        config.check_rules(rules.as_ref())?;

        let table = Arc::new(SharedGrid::new(
            config.grid_slots,
            config.pool_size,
            config.agent_count(),
            config.claim_size,
            config.placement_delay,
            view,
        ));

        let mut agents = Vec::with_capacity(config.agent_count());
        for (index, &kind) in config.agents.iter().enumerate() {
            let id = AgentId(index as u32);
            let spawned = agent::spawn(
                id,
                kind,
                Arc::clone(&table),
                config.tick,
                agent::agent_seed(config.seed, id),
            );
            match spawned {
                Ok(handle) => agents.push(handle),
                Err(err) => {
                    abort(&table, agents);
                    return Err(ConfigError::ThreadSpawnFailed {
                        reason: format!("agent {id}: {err}"),
                    });
                }
            }
        }

        // The arbiter only watches for disconnection; nothing is sent.
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(0);
        // Agent handles are handed over once the arbiter thread exists,
        // so a failed spawn can still join them here.
        let (handoff_tx, handoff_rx) = crossbeam_channel::bounded::<Vec<JoinHandle<()>>>(1);
        let arbiter = Arbiter::new(Arc::clone(&table), rules, &config);
        let spawned = thread::Builder::new()
            .name("claimset-arbiter".into())
            .spawn(move || {
                let agents = handoff_rx.recv().unwrap_or_default();
                arbiter.run(agents, stop_rx)
            });
        let arbiter = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                abort(&table, agents);
                return Err(ConfigError::ThreadSpawnFailed {
                    reason: format!("arbiter: {err}"),
                });
            }
        };
        if let Err(unsent) = handoff_tx.send(agents) {
            // The arbiter died before taking ownership.
            abort(&table, unsent.into_inner());
        }

        tracing::info!(
            agents = config.agent_count(),
            slots = config.grid_slots,
            pool = config.pool_size,
            "game spawned"
        );
        Ok(Self {
            table,
            kinds: config.agents,
            stop_tx: Some(stop_tx),
            arbiter: Some(arbiter),
            report: None,
            state: LifecycleState::Running,
        })
    }

    /// Input handle for `agent`, if it is a human agent.
    pub fn input(&self, agent: AgentId) -> Option<InputHandle> {
        match self.kinds.get(agent.index()) {
            Some(AgentKind::Human) => Some(InputHandle {
                table: Arc::clone(&self.table),
                agent,
            }),
            _ => None,
        }
    }

    /// The shared grid, for inspection.
    pub fn table(&self) -> &Arc<SharedGrid> {
        &self.table
    }

    /// Whether the arbiter has exited.
    pub fn is_finished(&self) -> bool {
        self.arbiter.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the game to end on its own and return the report.
    pub fn join(mut self) -> GameReport {
        self.collect()
    }

    /// Stop the game from outside and join every thread.
    ///
    /// Idempotent: later calls return the same report.
    pub fn shutdown(&mut self) -> GameReport {
        if self.state == LifecycleState::Running {
            tracing::info!("shutdown requested");
            // The arbiter wakes and joins the agents once it sees the stop.
            self.table.raise_termination();
            self.stop_tx.take();
        }
        self.collect()
    }

    fn collect(&mut self) -> GameReport {
        if let Some(report) = &self.report {
            return report.clone();
        }
        let report = match self.arbiter.take().map(JoinHandle::join) {
            Some(Ok(report)) => report,
            _ => {
                tracing::warn!("arbiter thread panicked");
                self.table.terminate();
                let scores = self.table.scores();
                GameReport {
                    winners: winners(&scores),
                    scores,
                    rounds: 0,
                    claims_resolved: 0,
                    finished: false,
                }
            }
        };
        self.stop_tx.take();
        self.state = LifecycleState::Stopped;
        self.report = Some(report.clone());
        report
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        if self.state == LifecycleState::Running {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("agents", &self.kinds)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Stop and join agents spawned before a startup failure.
fn abort(table: &SharedGrid, agents: Vec<JoinHandle<()>>) {
    tracing::warn!(agents = agents.len(), "startup failed; stopping agents");
    agent::stop_all(table, agents);
}
