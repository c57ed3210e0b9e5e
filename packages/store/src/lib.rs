//! # Folio Store
//!
//! Normalized, immutable storage for the resource graph.
//!
//! A [`State`] keeps one flat table per entity kind plus ownership, reference
//! and trash indices. Every write primitive returns a new `State`; unchanged
//! tables are shared with the previous one.
//!
//! ```text
//! Resource ──normalize──► State ──write primitive──► State' ──denormalize──► Resource
//! ```
//!
//! The store guards its own indices (ids, ownership, references). Whether a
//! move is type-legal or a reorder is a permutation is decided one layer up.

mod error;
mod normalize;
mod ops;
mod patch;
mod state;
mod trash;

pub use error::{StoreError, StoreResult};
pub use normalize::{denormalize, denormalize_subtree, normalize};
pub use patch::EntityPatch;
pub use state::State;
pub use trash::{RestoreOptions, TrashEntry, TrashPurgeError};
