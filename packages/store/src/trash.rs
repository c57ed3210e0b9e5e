//! # Trash
//!
//! Soft deletion. A trashed subtree leaves the live tables but keeps its ids
//! reserved, so it can come back exactly as it was. Reference edges into and
//! out of the subtree stay indexed until the trash is emptied.

use crate::error::{StoreError, StoreResult};
use crate::state::State;
use folio_model::{Entity, EntityKind, RangeItemRef};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One trashed subtree, keyed by its root
#[derive(Debug, Clone, PartialEq)]
pub struct TrashEntry {
    pub id: String,
    pub kind: EntityKind,
    /// Owner at the time of trashing
    pub parent_id: String,
    /// Position in the owner's child list
    pub index: usize,
    /// Position in the owner's member list when the owner is a range
    pub range_slot: Option<usize>,
    pub(crate) snapshot: Snapshot,
}

impl TrashEntry {
    /// The trashed subtree root as it was when trashed
    pub fn entity(&self) -> Option<&Entity> {
        self.snapshot.entities.first().map(|e| e.as_ref())
    }

    /// Every id in the subtree, preorder
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.snapshot.entities.iter().map(|e| e.id())
    }

    pub fn len(&self) -> usize {
        self.snapshot.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.entities.is_empty()
    }
}

/// Frozen copy of a subtree's records and ownership
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Snapshot {
    pub(crate) entities: Vec<Arc<Entity>>,
    pub(crate) children: HashMap<String, Vec<String>>,
    pub(crate) memberships: HashMap<String, Vec<String>>,
}

impl Snapshot {
    /// Drop an edge from `source` to a target that is being purged
    pub(crate) fn forget_reference(&mut self, source: &str, target: &str) {
        if let Some(list) = self.memberships.get_mut(source) {
            list.retain(|m| m != target);
            if list.is_empty() {
                self.memberships.remove(source);
            }
        }
        for entity in self.entities.iter_mut() {
            if entity.id() != source {
                continue;
            }
            if let Entity::Range(range) = Arc::make_mut(entity) {
                range
                    .items
                    .retain(|item| !matches!(item, RangeItemRef::Canvas(c) if c == target));
            }
        }
    }

    fn outgoing_references(&self) -> Vec<(String, String)> {
        let mut edges = Vec::new();
        for (source, targets) in &self.memberships {
            for target in targets {
                edges.push((source.clone(), target.clone()));
            }
        }
        for entity in &self.entities {
            if let Entity::Range(range) = entity.as_ref() {
                for item in &range.items {
                    if let RangeItemRef::Canvas(canvas) = item {
                        edges.push((range.id.clone(), canvas.clone()));
                    }
                }
            }
        }
        edges
    }
}

/// Where a restored subtree goes. Defaults to its original place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    pub parent_id: Option<String>,
    pub index: Option<usize>,
}

/// A trash root that could not be purged
#[derive(Debug, Clone, PartialEq)]
pub struct TrashPurgeError {
    pub id: String,
    pub error: StoreError,
}

impl State {
    /// Detach the subtree at `id` into the trash
    pub fn move_entity_to_trash(&self, id: &str) -> StoreResult<State> {
        let kind = self.require_kind(id)?;
        if self.root.as_deref() == Some(id) {
            return Err(StoreError::CannotDetachRoot(id.to_string()));
        }

        let mut ids = vec![id.to_string()];
        ids.extend(self.get_descendants(id));

        let mut snapshot = Snapshot::default();
        for member in &ids {
            if let Some(kind) = self.kinds.get(member) {
                if let Some(entity) = self.tables.table(*kind).get(member) {
                    snapshot.entities.push(entity.clone());
                }
            }
            if let Some(kids) = self.children.get(member) {
                snapshot.children.insert(member.clone(), kids.clone());
            }
            if let Some(listed) = self.memberships.get(member) {
                snapshot.memberships.insert(member.clone(), listed.clone());
            }
        }

        let mut next = self.clone();
        let Some((parent_id, index)) = next.unlink_child(id) else {
            return Err(StoreError::InvariantViolation(format!("{} has no owner", id)));
        };
        let range_slot = next.unlink_range_member(&parent_id, id);

        for member in &ids {
            next.drop_record(member);
        }
        let trashed = Arc::make_mut(&mut next.trashed);
        for member in &ids {
            trashed.insert(member.clone(), id.to_string());
        }

        Arc::make_mut(&mut next.trash).insert(
            id.to_string(),
            TrashEntry {
                id: id.to_string(),
                kind,
                parent_id,
                index,
                range_slot,
                snapshot,
            },
        );

        debug!(id = %id, size = ids.len(), "Entity moved to trash");
        Ok(next)
    }

    /// Bring a trash root back, by default where it came from
    pub fn restore_entity_from_trash(&self, id: &str, options: &RestoreOptions) -> StoreResult<State> {
        let Some(entry) = self.trash.get(id) else {
            return match self.trashed.get(id) {
                Some(root) => Err(StoreError::NotTrashRoot {
                    id: id.to_string(),
                    root: root.clone(),
                }),
                None => Err(StoreError::NotInTrash(id.to_string())),
            };
        };

        let (parent_id, index, slot) = match &options.parent_id {
            Some(parent) => {
                if !self.contains(parent) {
                    return Err(StoreError::ParentNotFound(parent.clone()));
                }
                let original = *parent == entry.parent_id;
                let slot = if original { entry.range_slot } else { None };
                (parent.clone(), options.index, slot)
            }
            None => {
                if !self.contains(&entry.parent_id) {
                    return Err(StoreError::OriginalParentMissing {
                        id: id.to_string(),
                        parent_id: entry.parent_id.clone(),
                    });
                }
                let index = options.index.or(Some(entry.index));
                (entry.parent_id.clone(), index, entry.range_slot)
            }
        };

        let entry = entry.clone();
        let mut next = self.clone();

        let trashed = Arc::make_mut(&mut next.trashed);
        for member in entry.ids() {
            trashed.remove(member);
        }
        Arc::make_mut(&mut next.trash).remove(id);

        for entity in &entry.snapshot.entities {
            let member = entity.id().to_string();
            Arc::make_mut(&mut next.kinds).insert(member.clone(), entity.kind());
            next.tables.table_mut(entity.kind()).insert(member, entity.clone());
        }
        for (owner, kids) in &entry.snapshot.children {
            for kid in kids {
                Arc::make_mut(&mut next.parents).insert(kid.clone(), owner.clone());
            }
            Arc::make_mut(&mut next.children).insert(owner.clone(), kids.clone());
        }
        for (collection, listed) in &entry.snapshot.memberships {
            Arc::make_mut(&mut next.memberships).insert(collection.clone(), listed.clone());
        }

        next.link_child(&parent_id, id, index);
        next.link_range_member(&parent_id, id, slot);

        debug!(id = %id, parent = %parent_id, "Entity restored from trash");
        Ok(next)
    }

    /// Permanently delete one trash root and sever its reference edges
    pub fn purge_from_trash(&self, id: &str) -> StoreResult<State> {
        let Some(entry) = self.trash.get(id) else {
            return match self.trashed.get(id) {
                Some(root) => Err(StoreError::NotTrashRoot {
                    id: id.to_string(),
                    root: root.clone(),
                }),
                None => Err(StoreError::AlreadyPurged(id.to_string())),
            };
        };

        let mut next = self.clone();
        for (source, target) in entry.snapshot.outgoing_references() {
            next.unindex_reference(&source, &target);
        }
        let ids: Vec<String> = entry.ids().map(str::to_string).collect();
        for member in &ids {
            next.purge_incoming(member);
        }

        let trashed = Arc::make_mut(&mut next.trashed);
        for member in &ids {
            trashed.remove(member);
        }
        Arc::make_mut(&mut next.trash).remove(id);
        Ok(next)
    }

    /// Purge every trash root. A root that fails is reported and left in
    /// the trash; the others are still purged.
    pub fn empty_trash(&self) -> (State, Vec<TrashPurgeError>) {
        let mut next = self.clone();
        let mut errors = Vec::new();

        let roots: Vec<String> = self.trash.keys().cloned().collect();
        for root in &roots {
            match next.purge_from_trash(root) {
                Ok(state) => next = state,
                Err(error) => {
                    warn!(id = %root, error = %error, "Failed to purge trash entry");
                    errors.push(TrashPurgeError {
                        id: root.clone(),
                        error,
                    });
                }
            }
        }

        info!(purged = roots.len() - errors.len(), failed = errors.len(), "Trash emptied");
        (next, errors)
    }
}
