//! Core types and traits for the claimset arbitration engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the engine and its collaborators: slot,
//! item and agent IDs, claim outcomes, error types, and the two
//! external seams, [`Combinatorics`] (claim validity) and [`GameView`]
//! (one-way display notifications).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod outcome;
pub mod rules;
pub mod view;

pub use error::{GridError, ToggleError};
pub use id::{AgentId, ItemId, SlotId, Tuple};
pub use outcome::Outcome;
pub use rules::Combinatorics;
pub use view::{GameView, NullView, ViewEvent};
