//! # Write Primitives
//!
//! Every primitive takes `&self` and returns a fresh [`State`]. The input is
//! never touched, so a failed call leaves the caller's state as it was.
//!
//! Type-compatibility and permutation checks are the caller's job (the
//! reducer); the store only refuses operations that would corrupt its own
//! indices: unknown ids, duplicate ids, ownership cycles, dangling references.

use crate::error::{StoreError, StoreResult};
use crate::patch::EntityPatch;
use crate::state::State;
use folio_model::{Entity, EntityKind, RangeItemRef};
use std::sync::Arc;
use tracing::debug;

impl State {
    /// Append `entity` to `parent_id`'s ordering; `None` makes it the root.
    pub fn add_entity(&self, entity: Entity, parent_id: Option<&str>) -> StoreResult<State> {
        self.insert_entity(entity, parent_id, None)
    }

    /// Insert `entity` at `index` in `parent_id`'s ordering (clamped).
    ///
    /// A new range may only list canvas references; sub-ranges are added
    /// afterwards with the range as their parent.
    pub fn insert_entity(
        &self,
        entity: Entity,
        parent_id: Option<&str>,
        index: Option<usize>,
    ) -> StoreResult<State> {
        let id = entity.id().to_string();
        if self.id_in_use(&id) {
            return Err(StoreError::DuplicateId(id));
        }

        if let Entity::Range(range) = &entity {
            for item in &range.items {
                match item {
                    RangeItemRef::Canvas(canvas) if self.get_entity_type(canvas) == Some(EntityKind::Canvas) => {}
                    RangeItemRef::Canvas(canvas) => {
                        return Err(StoreError::DanglingReference {
                            from: id,
                            to: canvas.clone(),
                            kind: EntityKind::Canvas,
                        })
                    }
                    RangeItemRef::Range(nested) => {
                        return Err(StoreError::DanglingReference {
                            from: id,
                            to: nested.clone(),
                            kind: EntityKind::Range,
                        })
                    }
                }
            }
        }

        let mut next = self.clone();
        match parent_id {
            Some(parent) => {
                next.require(parent)
                    .map_err(|_| StoreError::ParentNotFound(parent.to_string()))?;
                let outgoing = match &entity {
                    Entity::Range(range) => range.items.iter().map(|i| i.id().to_string()).collect(),
                    _ => Vec::new(),
                };
                next.insert_record(entity, true);
                next.link_child(parent, &id, index);
                next.link_range_member(parent, &id, None);
                for target in outgoing {
                    next.index_reference(&id, &target);
                }
            }
            None => {
                if let Some(root) = &self.root {
                    return Err(StoreError::RootExists(root.clone()));
                }
                next.insert_record(entity, true);
                next.root = Some(id.clone());
            }
        }

        debug!(id = %id, parent = ?parent_id, "Entity added");
        Ok(next)
    }

    /// Shallow-merge `patch` into one entity
    pub fn update_entity(&self, id: &str, patch: &EntityPatch) -> StoreResult<State> {
        let current = self.require(id)?;
        let updated = patch.apply(current)?;

        let mut next = self.clone();
        next.replace_record(updated);
        Ok(next)
    }

    /// Permanently remove `id` and everything it owns, severing every
    /// reference edge into or out of the removed subtree.
    pub fn remove_entity(&self, id: &str) -> StoreResult<State> {
        self.require(id)?;
        if self.root.as_deref() == Some(id) {
            return Err(StoreError::CannotDetachRoot(id.to_string()));
        }

        let mut next = self.clone();
        let mut doomed = vec![id.to_string()];
        doomed.extend(self.get_descendants(id));

        if let Some((parent, _)) = next.unlink_child(id) {
            next.unlink_range_member(&parent, id);
        }

        for gone in &doomed {
            for target in next.outgoing_references(gone) {
                next.unindex_reference(gone, &target);
            }
            next.purge_incoming(gone);
        }

        for gone in &doomed {
            next.drop_record(gone);
        }

        debug!(id = %id, removed = doomed.len(), "Entity removed");
        Ok(next)
    }

    /// Replace `parent_id`'s ordering with `new_order`.
    ///
    /// The caller guarantees `new_order` is a permutation of the current
    /// children. For a range the sub-range members are rewritten in place,
    /// leaving canvas references where they were.
    pub fn reorder_children(&self, parent_id: &str, new_order: Vec<String>) -> StoreResult<State> {
        let parent_kind = self.require_kind(parent_id)?;

        let mut next = self.clone();
        if parent_kind == EntityKind::Range {
            if let Some(Entity::Range(range)) = next.get_entity(parent_id) {
                let mut range = range.clone();
                let mut order = new_order.iter();
                let mut items = Vec::with_capacity(range.items.len());
                for item in range.items.drain(..) {
                    match item {
                        RangeItemRef::Range(_) => {
                            if let Some(id) = order.next() {
                                items.push(RangeItemRef::Range(id.clone()));
                            }
                        }
                        canvas => items.push(canvas),
                    }
                }
                items.extend(order.map(|id| RangeItemRef::Range(id.clone())));
                range.items = items;
                next.replace_record(Entity::Range(range));
            }
        }

        Arc::make_mut(&mut next.children).insert(parent_id.to_string(), new_order);
        Ok(next)
    }

    /// Detach `id` and reattach it under `new_parent_id` at `index` (clamped,
    /// `None` appends) as one step.
    pub fn move_entity(&self, id: &str, new_parent_id: &str, index: Option<usize>) -> StoreResult<State> {
        self.require(id)?;
        self.require(new_parent_id)
            .map_err(|_| StoreError::ParentNotFound(new_parent_id.to_string()))?;
        if self.root.as_deref() == Some(id) {
            return Err(StoreError::CannotDetachRoot(id.to_string()));
        }
        if id == new_parent_id || self.is_ancestor(id, new_parent_id) {
            return Err(StoreError::CycleDetected {
                id: id.to_string(),
                parent_id: new_parent_id.to_string(),
            });
        }

        let mut next = self.clone();
        if let Some((old_parent, _)) = next.unlink_child(id) {
            next.unlink_range_member(&old_parent, id);
        }
        next.link_child(new_parent_id, id, index);
        next.link_range_member(new_parent_id, id, None);

        debug!(id = %id, parent = %new_parent_id, "Entity moved");
        Ok(next)
    }

    /// List `manifest_id` in `collection_id` without transferring ownership
    pub fn add_membership(&self, collection_id: &str, manifest_id: &str) -> StoreResult<State> {
        if self.require_kind(collection_id)? != EntityKind::Collection {
            return Err(StoreError::NotFound(collection_id.to_string()));
        }
        if self.get_entity_type(manifest_id) != Some(EntityKind::Manifest) {
            return Err(StoreError::DanglingReference {
                from: collection_id.to_string(),
                to: manifest_id.to_string(),
                kind: EntityKind::Manifest,
            });
        }
        if self.memberships(collection_id).iter().any(|m| m == manifest_id) {
            return Ok(self.clone());
        }

        let mut next = self.clone();
        Arc::make_mut(&mut next.memberships)
            .entry(collection_id.to_string())
            .or_default()
            .push(manifest_id.to_string());
        next.index_reference(collection_id, manifest_id);
        Ok(next)
    }

    pub fn remove_membership(&self, collection_id: &str, manifest_id: &str) -> StoreResult<State> {
        self.require(collection_id)?;
        if !self.memberships(collection_id).iter().any(|m| m == manifest_id) {
            return Err(StoreError::NotFound(manifest_id.to_string()));
        }

        let mut next = self.clone();
        next.drop_membership(collection_id, manifest_id);
        next.unindex_reference(collection_id, manifest_id);
        Ok(next)
    }

    /// Replace a range's member list.
    ///
    /// Canvas members must be live canvases. Sub-range members become the
    /// range's child ordering; the caller guarantees they are exactly the
    /// current sub-ranges.
    pub fn set_range_items(&self, range_id: &str, items: Vec<RangeItemRef>) -> StoreResult<State> {
        let Some(Entity::Range(range)) = self.get_entity(range_id) else {
            return Err(StoreError::NotFound(range_id.to_string()));
        };

        for item in &items {
            if let RangeItemRef::Canvas(canvas) = item {
                if self.get_entity_type(canvas) != Some(EntityKind::Canvas) {
                    return Err(StoreError::DanglingReference {
                        from: range_id.to_string(),
                        to: canvas.clone(),
                        kind: EntityKind::Canvas,
                    });
                }
            }
        }

        let mut next = self.clone();
        for old in &range.items {
            if let RangeItemRef::Canvas(canvas) = old {
                next.unindex_reference(range_id, canvas);
            }
        }
        let mut order = Vec::new();
        for item in &items {
            match item {
                RangeItemRef::Canvas(canvas) => next.index_reference(range_id, canvas),
                RangeItemRef::Range(nested) => order.push(nested.clone()),
            }
        }

        let mut updated = range.clone();
        updated.items = items;
        next.replace_record(Entity::Range(updated));
        Arc::make_mut(&mut next.children).insert(range_id.to_string(), order);
        Ok(next)
    }
}

/// In-place removal helpers
impl State {
    pub(crate) fn drop_record(&mut self, id: &str) {
        if let Some(kind) = Arc::make_mut(&mut self.kinds).remove(id) {
            self.tables.table_mut(kind).remove(id);
        }
        Arc::make_mut(&mut self.parents).remove(id);
        Arc::make_mut(&mut self.children).remove(id);
        Arc::make_mut(&mut self.memberships).remove(id);
    }

    pub(crate) fn drop_membership(&mut self, collection_id: &str, manifest_id: &str) {
        let memberships = Arc::make_mut(&mut self.memberships);
        if let Some(list) = memberships.get_mut(collection_id) {
            list.retain(|m| m != manifest_id);
            if list.is_empty() {
                memberships.remove(collection_id);
            }
        }
    }

    /// Remove every reference edge pointing at `target`, wherever the
    /// referring collection or range lives (tree or trash).
    pub(crate) fn purge_incoming(&mut self, target: &str) {
        let Some(sources) = Arc::make_mut(&mut self.referrers).remove(target) else {
            return;
        };

        for source in sources {
            if self.contains(&source) {
                self.drop_membership(&source, target);
                if let Some(Entity::Range(range)) = self.get_entity(&source) {
                    let mut range = range.clone();
                    range
                        .items
                        .retain(|item| !matches!(item, RangeItemRef::Canvas(c) if c == target));
                    self.replace_record(Entity::Range(range));
                }
            } else if let Some(root) = self.trashed.get(&source).cloned() {
                if let Some(entry) = Arc::make_mut(&mut self.trash).get_mut(&root) {
                    entry.snapshot.forget_reference(&source, target);
                }
            }
        }
    }
}
