//! # Folio Editor
//!
//! Editing session over a normalized resource graph.
//!
//! ```text
//! actions::*  ──►  Dispatcher::dispatch  ──►  reduce(state, action)
//!                        │                          │
//!                        │                 folio-validator formats
//!                        │                 folio-store primitives
//!                        ▼
//!              History (undo/redo) + listeners
//!                        │
//!                        ▼
//!                 Selectors (memoized read models)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{actions, Dispatcher, Selectors};
//!
//! let mut editor = Dispatcher::from_document(&document, 100)?;
//! editor.subscribe_errors(|error, _| eprintln!("{}", error));
//!
//! editor.dispatch(actions::move_item("c1", "m2", Some(0)));
//! editor.undo();
//!
//! let rows = Selectors::new("en").subtree(editor.state(), "m2");
//! ```

pub mod actions;
mod dispatcher;
mod errors;
mod history;
mod reducer;
mod selectors;

pub use actions::{Action, PropertyChanges};
pub use dispatcher::{Dispatcher, ListenerId, Notification};
pub use errors::{EditorError, ReduceError};
pub use history::{History, HistoryEntry};
pub use reducer::{reduce, reduce_value, Change, ItemError, ReduceResult, Reduction};
pub use selectors::{Crumb, Selectors, TrashRow, TreeRow};
