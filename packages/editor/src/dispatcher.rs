//! # Dispatcher
//!
//! Owns the current [`State`], sequences reducer calls, keeps history, and
//! notifies listeners.
//!
//! ```text
//! dispatch(action) ─► reduce ─┬─ Ok  ─► commit + history + state listeners
//!                             │         (+ error listeners per failed batch item)
//!                             └─ Err ─► error listeners (state untouched)
//! ```

use crate::actions::Action;
use crate::errors::{EditorError, ReduceError};
use crate::history::{History, HistoryEntry};
use crate::reducer::{self, Change, Reduction};
use chrono::Utc;
use folio_model::Resource;
use folio_store::{normalize, State};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What caused a state-change notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification<'a> {
    /// A dispatched action was committed
    Action(&'a Action),
    /// Undo or redo restored a snapshot
    NoOpBatch,
}

/// Handle returned by `subscribe*`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type StateListener = Box<dyn FnMut(&State, Notification<'_>)>;
type ErrorListener = Box<dyn FnMut(&ReduceError, Option<&Action>)>;

pub struct Dispatcher {
    state: Arc<State>,
    history: History,
    last_changes: Vec<Change>,
    listeners: Vec<(ListenerId, StateListener)>,
    error_listeners: Vec<(ListenerId, ErrorListener)>,
    next_listener: u64,
}

impl Dispatcher {
    /// `history_capacity` of 0 keeps every step
    pub fn new(state: State, history_capacity: usize) -> Self {
        Self {
            state: Arc::new(state),
            history: History::new(history_capacity),
            last_changes: Vec::new(),
            listeners: Vec::new(),
            error_listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Normalize a nested document and start editing it
    pub fn from_document(document: &Resource, history_capacity: usize) -> Result<Self, EditorError> {
        let state = normalize(document)?;
        info!(root = %document.id(), entities = state.len(), "Editing session started");
        Ok(Self::new(state, history_capacity))
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Audit records of the last committed dispatch
    pub fn last_changes(&self) -> &[Change] {
        &self.last_changes
    }

    /// Reduce and commit. Returns true only if the whole action applied.
    ///
    /// Batch actions that partly fail still commit their successful items;
    /// the per-item errors go to the error listeners and the call returns
    /// false.
    #[instrument(skip(self, action), fields(action = action.type_name()))]
    pub fn dispatch(&mut self, action: Action) -> bool {
        match reducer::reduce(&self.state, &action) {
            Ok(reduction) => {
                let success = reduction.is_success();
                self.commit(action, reduction);
                success
            }
            Err(error) => {
                warn!(error = %error, "Action rejected");
                self.notify_error(&error, Some(&action));
                false
            }
        }
    }

    /// Decode and dispatch a raw JSON action
    pub fn dispatch_value(&mut self, value: &Value) -> bool {
        let action = match value.get("type").and_then(Value::as_str) {
            Some(tag) if !Action::TYPES.contains(&tag) => Err(ReduceError::UnknownAction(tag.to_string())),
            Some(tag) => serde_json::from_value::<Action>(value.clone())
                .map_err(|e| ReduceError::Validation(format!("Malformed {} payload: {}", tag, e))),
            None => Err(ReduceError::Validation("Action is missing its 'type' tag".to_string())),
        };

        match action {
            Ok(action) => self.dispatch(action),
            Err(error) => {
                warn!(error = %error, "Raw action rejected");
                self.notify_error(&error, None);
                false
            }
        }
    }

    fn commit(&mut self, action: Action, reduction: Reduction) {
        let Reduction {
            state,
            changes,
            item_errors,
        } = reduction;

        let before = Arc::clone(&self.state);
        let after = Arc::new(state);
        self.state = Arc::clone(&after);
        self.last_changes = changes;
        self.history.push(HistoryEntry {
            action: action.clone(),
            before,
            after,
            timestamp: Utc::now(),
        });

        debug!(changes = self.last_changes.len(), history = self.history.len(), "Action committed");
        self.notify(Notification::Action(&action));

        for item in &item_errors {
            self.notify_error(&item.error, Some(&action));
        }
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(state) => {
                self.restore(state);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(state) => {
                self.restore(state);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, state: Arc<State>) {
        self.state = state;
        self.last_changes.clear();
        self.notify(Notification::NoOpBatch);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&State, Notification<'_>) + 'static) -> ListenerId {
        let id = self.allocate_id();
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn subscribe_errors(&mut self, listener: impl FnMut(&ReduceError, Option<&Action>) + 'static) -> ListenerId {
        let id = self.allocate_id();
        self.error_listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len() + self.error_listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.error_listeners.retain(|(listener, _)| *listener != id);
        before != self.listeners.len() + self.error_listeners.len()
    }

    fn allocate_id(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }

    fn notify(&mut self, notification: Notification<'_>) {
        let state = Arc::clone(&self.state);
        for (_, listener) in &mut self.listeners {
            listener(&state, notification);
        }
    }

    fn notify_error(&mut self, error: &ReduceError, action: Option<&Action>) {
        for (_, listener) in &mut self.error_listeners {
            listener(error, action);
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("entities", &self.state.len())
            .field("history", &self.history.len())
            .field("listeners", &self.listeners.len())
            .field("error_listeners", &self.error_listeners.len())
            .finish()
    }
}
