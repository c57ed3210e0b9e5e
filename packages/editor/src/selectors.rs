//! # Selectors
//!
//! Derived read models for the UI, memoized per state snapshot.
//!
//! The cache is keyed by state identity (`Arc` pointer), which is sound
//! because states are never mutated in place: a new dispatch always yields
//! a new `Arc`. Handing in a different snapshot drops the whole cache.

use folio_model::{EntityKind, LanguageMap};
use folio_store::{denormalize, State, StoreError};
use folio_validator::{validate_document, Issue, Summary, ValidateOptions};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One line of a subtree listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    pub id: String,
    pub kind: EntityKind,
    /// 0 for the listed subtree's root
    pub depth: usize,
    pub label: Option<String>,
}

/// One step of a breadcrumb path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub id: String,
    pub kind: EntityKind,
    pub label: Option<String>,
}

/// A trash root as shown in a recycle-bin panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashRow {
    pub id: String,
    pub kind: EntityKind,
    pub parent_id: String,
    pub index: usize,
    /// Entities in the trashed subtree, root included
    pub size: usize,
    pub label: Option<String>,
}

#[derive(Default)]
struct Cache {
    key: Option<Arc<State>>,
    subtrees: HashMap<String, Arc<Vec<TreeRow>>>,
    breadcrumbs: HashMap<String, Arc<Vec<Crumb>>>,
    by_kind: HashMap<EntityKind, Arc<Vec<String>>>,
    trash: Option<Arc<Vec<TrashRow>>>,
    issues: Option<Arc<Vec<Issue>>>,
}

pub struct Selectors {
    locale: String,
    cache: RefCell<Cache>,
}

impl Selectors {
    /// `locale` picks label variants (falls back to `none`, then any)
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            cache: RefCell::new(Cache::default()),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    fn label(&self, state: &State, id: &str) -> Option<String> {
        let entity = state.get_entity(id)?;
        label_text(entity.props().label.as_ref(), &self.locale)
    }

    /// Drop cached results computed for another snapshot
    fn sync(&self, state: &Arc<State>) {
        let mut cache = self.cache.borrow_mut();
        let current = cache.key.as_ref().is_some_and(|key| Arc::ptr_eq(key, state));
        if !current {
            *cache = Cache {
                key: Some(Arc::clone(state)),
                ..Default::default()
            };
        }
    }

    /// `id` and everything it owns, preorder with depth
    pub fn subtree(&self, state: &Arc<State>, id: &str) -> Arc<Vec<TreeRow>> {
        self.sync(state);
        if let Some(rows) = self.cache.borrow().subtrees.get(id) {
            return Arc::clone(rows);
        }

        let mut rows = Vec::new();
        if let Some(kind) = state.get_entity_type(id) {
            let mut stack = vec![(id.to_string(), kind, 0usize)];
            while let Some((next, kind, depth)) = stack.pop() {
                for child in state.get_child_ids(&next).iter().rev() {
                    if let Some(child_kind) = state.get_entity_type(child) {
                        stack.push((child.clone(), child_kind, depth + 1));
                    }
                }
                rows.push(TreeRow {
                    label: self.label(state, &next),
                    id: next,
                    kind,
                    depth,
                });
            }
        }

        let rows = Arc::new(rows);
        self.cache
            .borrow_mut()
            .subtrees
            .insert(id.to_string(), Arc::clone(&rows));
        rows
    }

    /// Path from the root down to `id`, inclusive; empty if `id` is not live
    pub fn breadcrumbs(&self, state: &Arc<State>, id: &str) -> Arc<Vec<Crumb>> {
        self.sync(state);
        if let Some(path) = self.cache.borrow().breadcrumbs.get(id) {
            return Arc::clone(path);
        }

        let mut path = Vec::new();
        if state.contains(id) {
            let mut ids = state.get_ancestors(id);
            ids.reverse();
            ids.push(id.to_string());
            for step in ids {
                if let Some(kind) = state.get_entity_type(&step) {
                    path.push(Crumb {
                        label: self.label(state, &step),
                        id: step,
                        kind,
                    });
                }
            }
        }

        let path = Arc::new(path);
        self.cache
            .borrow_mut()
            .breadcrumbs
            .insert(id.to_string(), Arc::clone(&path));
        path
    }

    /// Live ids of one kind, sorted
    pub fn ids_by_kind(&self, state: &Arc<State>, kind: EntityKind) -> Arc<Vec<String>> {
        self.sync(state);
        if let Some(ids) = self.cache.borrow().by_kind.get(&kind) {
            return Arc::clone(ids);
        }

        let ids = Arc::new(state.ids_of_kind(kind));
        self.cache.borrow_mut().by_kind.insert(kind, Arc::clone(&ids));
        ids
    }

    pub fn trash(&self, state: &Arc<State>) -> Arc<Vec<TrashRow>> {
        self.sync(state);
        if let Some(rows) = &self.cache.borrow().trash {
            return Arc::clone(rows);
        }

        let rows: Vec<TrashRow> = state
            .trash_entries()
            .map(|entry| TrashRow {
                id: entry.id.clone(),
                kind: entry.kind,
                parent_id: entry.parent_id.clone(),
                index: entry.index,
                size: entry.len(),
                label: entry
                    .entity()
                    .and_then(|e| label_text(e.props().label.as_ref(), &self.locale)),
            })
            .collect();

        let rows = Arc::new(rows);
        self.cache.borrow_mut().trash = Some(Arc::clone(&rows));
        rows
    }

    /// Tree-wide validation of the live document; empty for an empty store
    pub fn issues(&self, state: &Arc<State>) -> Arc<Vec<Issue>> {
        self.sync(state);
        if let Some(issues) = &self.cache.borrow().issues {
            return Arc::clone(issues);
        }

        let issues = match denormalize(state) {
            Ok(document) => validate_document(&document, ValidateOptions::default()),
            Err(StoreError::EmptyStore) => Vec::new(),
            Err(error) => {
                debug!(error = %error, "Cannot rebuild document for validation");
                Vec::new()
            }
        };

        let issues = Arc::new(issues);
        self.cache.borrow_mut().issues = Some(Arc::clone(&issues));
        issues
    }

    /// Counts by severity and category
    pub fn validation_summary(&self, state: &Arc<State>) -> Summary {
        Summary::of(&self.issues(state))
    }

    /// Issues about one entity, for a properties panel
    pub fn issues_for(&self, state: &Arc<State>, id: &str) -> Vec<Issue> {
        self.issues(state)
            .iter()
            .filter(|issue| issue.entity_id == id)
            .cloned()
            .collect()
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self::new("none")
    }
}

fn label_text(label: Option<&LanguageMap>, locale: &str) -> Option<String> {
    label.and_then(|l| l.first_value(locale)).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::{Canvas, Collection, CollectionItem, Manifest, Resource};
    use folio_store::normalize;

    fn state() -> Arc<State> {
        let manifest = Manifest::new("m1")
            .with_label("en", "Letters")
            .with_canvas(Canvas::new("c1", 10, 10).with_label("en", "First"))
            .with_canvas(Canvas::new("c2", 10, 10));
        let root = Collection::new("g1")
            .with_label("none", "Archive")
            .with_item(CollectionItem::Manifest(manifest));
        Arc::new(normalize(&Resource::Collection(root)).unwrap())
    }

    #[test]
    fn test_subtree_rows_carry_depth_and_label() {
        let s = state();
        let selectors = Selectors::new("en");
        let rows = selectors.subtree(&s, "g1");

        let summary: Vec<(&str, usize)> = rows.iter().map(|r| (r.id.as_str(), r.depth)).collect();
        assert_eq!(summary, vec![("g1", 0), ("m1", 1), ("c1", 2), ("c2", 2)]);
        assert_eq!(rows[0].label.as_deref(), Some("Archive"));
        assert_eq!(rows[2].label.as_deref(), Some("First"));
        assert_eq!(rows[3].label, None);
    }

    #[test]
    fn test_breadcrumbs_run_root_first() {
        let s = state();
        let selectors = Selectors::default();
        let path: Vec<String> = selectors.breadcrumbs(&s, "c2").iter().map(|c| c.id.clone()).collect();
        assert_eq!(path, vec!["g1", "m1", "c2"]);
        assert!(selectors.breadcrumbs(&s, "nope").is_empty());
    }

    #[test]
    fn test_results_are_memoized_per_snapshot() {
        let s = state();
        let selectors = Selectors::default();
        let first = selectors.ids_by_kind(&s, EntityKind::Canvas);
        let again = selectors.ids_by_kind(&s, EntityKind::Canvas);
        assert!(Arc::ptr_eq(&first, &again));

        let moved = Arc::new(s.move_entity_to_trash("c1").unwrap());
        let after = selectors.ids_by_kind(&moved, EntityKind::Canvas);
        assert_eq!(*after, vec!["c2".to_string()]);
        assert_eq!(selectors.trash(&moved)[0].id, "c1");
    }

    #[test]
    fn test_validation_summary_counts() {
        let s = state();
        let summary = Selectors::default().validation_summary(&s);
        // Ids are not absolute URIs and canvases have no painted content
        assert!(summary.errors > 0);
        assert!(summary.warnings > 0);

        assert!(Selectors::default().validation_summary(&Arc::new(State::new())).is_clean());
    }
}
