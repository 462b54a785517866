//! Claimset: concurrent claim arbitration over a shared grid.
//!
//! One arbiter thread deals items from a pool onto a grid of slots.
//! Agent threads mark slots; a full marker set is a claim, which the
//! arbiter validates in FIFO order against the live grid, scoring valid
//! claims and freezing the claimant either way.
//!
//! This is the facade crate that re-exports the public API of the
//! claimset sub-crates.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use claimset::prelude::*;
//!
//! let rules = FeatureRules::new(2, 3).unwrap();
//! let config = GameConfig {
//!     agents: vec![AgentKind::Autonomous; 2],
//!     claim_size: rules.claim_size(),
//!     pool_size: rules.pool_size(),
//!     grid_slots: 9,
//!     timer: TimerMode::Disabled,
//!     placement_delay: Duration::ZERO,
//!     ..GameConfig::default()
//! };
//! let game = Game::start(config, Arc::new(rules), Arc::new(NullView)).unwrap();
//! let report = game.join();
//! assert!(report.finished);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `claimset-core` | IDs, outcomes, errors, `Combinatorics`, `GameView` |
//! | [`rules`] | `claimset-rules` | `FeatureRules`, the reference claim rules |
//! | [`engine`] | `claimset-engine` | Config, shared grid, arbiter, agents, `Game` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod log_view;

pub use log_view::LogView;

/// Core types, traits, and IDs (`claimset-core`).
pub use claimset_core as types;

/// Reference claim rules (`claimset-rules`).
pub use claimset_rules as rules;

/// Arbiter, shared grid, and game lifecycle (`claimset-engine`).
///
/// [`engine::Game`] runs a whole game on background threads;
/// [`engine::Arbiter`] can also be stepped by hand.
pub use claimset_engine as engine;

/// Common imports for typical claimset usage.
///
/// ```rust
/// use claimset::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use claimset_core::{
        AgentId, Combinatorics, GameView, ItemId, NullView, Outcome, SlotId, ViewEvent,
    };

    // Errors
    pub use claimset_core::{GridError, ToggleError};
    pub use claimset_engine::ConfigError;

    // Rules
    pub use claimset_rules::FeatureRules;

    // Engine
    pub use claimset_engine::{
        AgentKind, Game, GameConfig, GameReport, InputHandle, SharedGrid, TimerMode,
    };

    // Display
    pub use crate::LogView;
}
