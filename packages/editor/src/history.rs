//! # History
//!
//! Bounded undo/redo over whole-state snapshots.
//!
//! States share their tables, so holding both sides of every step costs
//! little. The cursor sits between the last applied entry and the redo tail:
//!
//! ```text
//! entries: [a, b, c, d]
//!                 ^ cursor = 3  (a..c applied, d undone)
//! ```

use crate::actions::Action;
use chrono::{DateTime, Utc};
use folio_store::State;
use std::collections::VecDeque;
use std::sync::Arc;

/// One committed dispatch
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub action: Action,
    pub before: Arc<State>,
    pub after: Arc<State>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,

    /// Number of entries currently applied
    cursor: usize,

    /// Maximum number of entries (0 = unlimited)
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            capacity,
        }
    }

    /// Record a committed step, dropping any redo tail and evicting the
    /// oldest entry when full.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.cursor);
        self.entries.push_back(entry);
        self.cursor += 1;

        if self.capacity > 0 && self.entries.len() > self.capacity {
            self.entries.pop_front();
            self.cursor -= 1;
        }
    }

    /// Step back; returns the state to restore
    pub fn undo(&mut self) -> Option<Arc<State>> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).map(|e| Arc::clone(&e.before))
    }

    /// Step forward; returns the state to restore
    pub fn redo(&mut self) -> Option<Arc<State>> {
        let entry = self.entries.get(self.cursor)?;
        self.cursor += 1;
        Some(Arc::clone(&entry.after))
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries oldest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry {
            action: Action::MoveToTrash { id: format!("e{}", n) },
            before: Arc::new(State::new()),
            after: Arc::new(State::new()),
            timestamp: Utc::now(),
        }
    }

    fn ids(history: &History) -> Vec<String> {
        history
            .entries()
            .map(|e| match &e.action {
                Action::MoveToTrash { id } => id.clone(),
                other => other.type_name().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new(3);
        for n in 0..4 {
            history.push(entry(n));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(ids(&history), vec!["e1", "e2", "e3"]);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_discards_redo_tail() {
        let mut history = History::new(0);
        history.push(entry(0));
        history.push(entry(1));
        history.push(entry(2));

        assert!(history.undo().is_some());
        assert!(history.undo().is_some());
        assert!(history.can_redo());

        history.push(entry(3));
        assert_eq!(ids(&history), vec!["e0", "e3"]);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_past_start_is_none() {
        let mut history = History::new(2);
        history.push(entry(0));
        assert!(history.undo().is_some());
        assert!(history.undo().is_none());
        assert!(history.redo().is_some());
        assert!(history.redo().is_none());
    }
}
