//! Arbiter, shared grid, and agent threads for the claimset engine.
//!
//! Provides [`Game`], which spawns one arbiter thread and one thread per
//! agent over a [`SharedGrid`]. Agents toggle markers; a completed
//! marker set is enqueued as a claim and resolved by the [`Arbiter`] in
//! FIFO order against the live grid.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod agent;
pub mod arbiter;
pub mod config;
pub mod game;
pub mod grid;
pub mod markers;
pub mod table;
pub mod timer;

pub use arbiter::{winners, Arbiter, RoundState};
pub use config::{AgentKind, ConfigError, GameConfig, TimerMode};
pub use game::{Game, GameReport, InputHandle};
pub use grid::GridState;
pub use markers::{Marker, MarkerSet};
pub use table::{SharedGrid, Toggle};
pub use timer::Countdown;
