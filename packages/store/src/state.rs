//! # Normalized State
//!
//! Flat, id-keyed tables plus the indices that make every read primitive
//! O(1) or O(depth).
//!
//! ## Sharing
//!
//! Every table sits behind an `Arc`. Write primitives clone the `State`
//! value (a handful of pointer copies) and call `Arc::make_mut` only on the
//! tables they touch, so earlier states stay valid and cheap to keep in an
//! undo history.
//!
//! ## Tables
//!
//! ```text
//! tables[kind]  id → Entity          (one table per kind)
//! kinds         id → kind            (type index)
//! parents       id → owning parent
//! children      id → ordered owned children
//! memberships   collection → listed (non-owned) manifests
//! referrers     target → collections/ranges pointing at it
//! trash         trash root → TrashEntry
//! trashed       any trashed id → its trash root
//! ```

use crate::error::{StoreError, StoreResult};
use crate::trash::TrashEntry;
use folio_model::{Entity, EntityKind, RangeItemRef};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

pub(crate) type Table = Arc<HashMap<String, Arc<Entity>>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TypeTables {
    collections: Table,
    manifests: Table,
    canvases: Table,
    ranges: Table,
    pages: Table,
    annotations: Table,
}

impl TypeTables {
    pub(crate) fn table(&self, kind: EntityKind) -> &HashMap<String, Arc<Entity>> {
        match kind {
            EntityKind::Collection => &self.collections,
            EntityKind::Manifest => &self.manifests,
            EntityKind::Canvas => &self.canvases,
            EntityKind::Range => &self.ranges,
            EntityKind::AnnotationPage => &self.pages,
            EntityKind::Annotation => &self.annotations,
        }
    }

    pub(crate) fn table_mut(&mut self, kind: EntityKind) -> &mut HashMap<String, Arc<Entity>> {
        Arc::make_mut(match kind {
            EntityKind::Collection => &mut self.collections,
            EntityKind::Manifest => &mut self.manifests,
            EntityKind::Canvas => &mut self.canvases,
            EntityKind::Range => &mut self.ranges,
            EntityKind::AnnotationPage => &mut self.pages,
            EntityKind::Annotation => &mut self.annotations,
        })
    }
}

/// Immutable snapshot of the whole resource graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub(crate) root: Option<String>,
    pub(crate) tables: TypeTables,
    pub(crate) kinds: Arc<HashMap<String, EntityKind>>,
    pub(crate) parents: Arc<HashMap<String, String>>,
    pub(crate) children: Arc<HashMap<String, Vec<String>>>,
    pub(crate) memberships: Arc<HashMap<String, Vec<String>>>,
    pub(crate) referrers: Arc<HashMap<String, BTreeSet<String>>>,
    pub(crate) trash: Arc<BTreeMap<String, TrashEntry>>,
    pub(crate) trashed: Arc<HashMap<String, String>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// True if `id` is live (not trashed, not removed)
    pub fn contains(&self, id: &str) -> bool {
        self.kinds.contains_key(id)
    }

    pub fn get_entity(&self, id: &str) -> Option<&Entity> {
        let kind = self.kinds.get(id)?;
        self.tables.table(*kind).get(id).map(|e| e.as_ref())
    }

    pub fn get_entity_type(&self, id: &str) -> Option<EntityKind> {
        self.kinds.get(id).copied()
    }

    /// Ordered owned children; empty for leaves and unknown ids
    pub fn get_child_ids(&self, id: &str) -> &[String] {
        self.children.get(id).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// Whether `id` has a child list at all (a collection may lack one)
    pub fn has_child_list(&self, id: &str) -> bool {
        self.children.contains_key(id)
    }

    pub fn get_parent_id(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(|p| p.as_str())
    }

    /// Owners of `id`, nearest first, ending at the root
    pub fn get_ancestors(&self, id: &str) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut current = self.parents.get(id);
        while let Some(parent) = current {
            // Guards against a corrupt parent map looping forever
            if ancestors.len() > self.kinds.len() {
                break;
            }
            ancestors.push(parent.clone());
            current = self.parents.get(parent);
        }
        ancestors
    }

    /// Everything `id` owns, preorder, excluding `id` itself
    pub fn get_descendants(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<&String> = self.get_child_ids(id).iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next.clone());
            stack.extend(self.get_child_ids(next).iter().rev());
        }
        out
    }

    pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        self.get_ancestors(id).iter().any(|a| a == ancestor)
    }

    /// Manifests listed by `collection_id` without being owned
    pub fn memberships(&self, collection_id: &str) -> &[String] {
        self.memberships
            .get(collection_id)
            .map(|m| m.as_slice())
            .unwrap_or(&[])
    }

    /// Collections and ranges that reference `id` without owning it
    pub fn referrers(&self, id: &str) -> Vec<String> {
        self.referrers
            .get(id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Live ids of one kind, sorted
    pub fn ids_of_kind(&self, kind: EntityKind) -> Vec<String> {
        let mut ids: Vec<String> = self.tables.table(kind).keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_trashed(&self, id: &str) -> bool {
        self.trashed.contains_key(id)
    }

    pub fn trash_entry(&self, id: &str) -> Option<&TrashEntry> {
        self.trash.get(id)
    }

    /// Trash roots in id order
    pub fn trash_entries(&self) -> impl Iterator<Item = &TrashEntry> {
        self.trash.values()
    }

    /// True if `id` names any entity, live or trashed
    pub(crate) fn id_in_use(&self, id: &str) -> bool {
        self.kinds.contains_key(id) || self.trashed.contains_key(id)
    }

    pub(crate) fn require(&self, id: &str) -> StoreResult<&Entity> {
        self.get_entity(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub(crate) fn require_kind(&self, id: &str) -> StoreResult<EntityKind> {
        self.get_entity_type(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Verifies the structural invariants. Intended for tests and debugging.
    pub fn check_invariants(&self) -> StoreResult<()> {
        let violation = |msg: String| Err(StoreError::InvariantViolation(msg));

        // Every id lives in exactly the table its kind names
        for (id, kind) in self.kinds.iter() {
            for other in EntityKind::ALL {
                let present = self.tables.table(other).contains_key(id);
                if present != (other == *kind) {
                    return violation(format!("{} is misfiled in the {} table", id, other));
                }
            }
            if self.trashed.contains_key(id) {
                return violation(format!("{} is both live and trashed", id));
            }
        }
        for kind in EntityKind::ALL {
            for (id, entity) in self.tables.table(kind) {
                if self.kinds.get(id) != Some(&kind) || entity.kind() != kind {
                    return violation(format!("{} in the {} table has no matching type entry", id, kind));
                }
            }
        }

        // Child lists agree with the parent index and the compatibility matrix
        let mut owned = HashSet::new();
        for (parent, kids) in self.children.iter() {
            let Some(parent_kind) = self.get_entity_type(parent) else {
                return violation(format!("child list for missing parent {}", parent));
            };
            for kid in kids {
                let Some(kid_kind) = self.get_entity_type(kid) else {
                    return violation(format!("{} lists missing child {}", parent, kid));
                };
                if self.get_parent_id(kid) != Some(parent.as_str()) {
                    return violation(format!("{} does not name {} as its owner", kid, parent));
                }
                if !owned.insert(kid.clone()) {
                    return violation(format!("{} is owned more than once", kid));
                }
                if !parent_kind.can_contain(kid_kind) {
                    return violation(format!("{} {} cannot contain {} {}", parent_kind, parent, kid_kind, kid));
                }
            }
        }
        for id in self.kinds.keys() {
            let is_root = self.root.as_deref() == Some(id.as_str());
            if is_root == owned.contains(id) {
                return violation(format!("{} has the wrong number of owners", id));
            }
            if self.get_ancestors(id).len() >= self.kinds.len() && !self.kinds.is_empty() {
                return violation(format!("ownership cycle through {}", id));
            }
        }

        // Range member lists mirror the owned sub-range ordering
        for (id, entity) in self.tables.table(EntityKind::Range) {
            if let Entity::Range(range) = entity.as_ref() {
                let nested: Vec<&str> = range
                    .items
                    .iter()
                    .filter_map(|item| match item {
                        RangeItemRef::Range(r) => Some(r.as_str()),
                        RangeItemRef::Canvas(_) => None,
                    })
                    .collect();
                let kids: Vec<&str> = self.get_child_ids(id).iter().map(|s| s.as_str()).collect();
                if nested != kids {
                    return violation(format!("range {} members disagree with its children", id));
                }
            }
        }

        // Reference edges point at existing entities and are indexed
        for (collection, targets) in self.memberships.iter() {
            for target in targets {
                if !self.id_in_use(target) {
                    return violation(format!("{} lists missing manifest {}", collection, target));
                }
                if !self.referrers.get(target).is_some_and(|r| r.contains(collection)) {
                    return violation(format!("membership {} → {} is not indexed", collection, target));
                }
            }
        }
        for (target, sources) in self.referrers.iter() {
            if !self.id_in_use(target) {
                return violation(format!("reference index holds missing target {}", target));
            }
            for source in sources {
                if !self.id_in_use(source) {
                    return violation(format!("reference index holds missing source {}", source));
                }
            }
        }

        Ok(())
    }
}

/// In-place helpers used while building the next state
impl State {
    pub(crate) fn insert_record(&mut self, entity: Entity, with_child_list: bool) {
        let id = entity.id().to_string();
        let kind = entity.kind();
        Arc::make_mut(&mut self.kinds).insert(id.clone(), kind);
        if with_child_list {
            Arc::make_mut(&mut self.children).entry(id.clone()).or_default();
        }
        self.tables.table_mut(kind).insert(id, Arc::new(entity));
    }

    pub(crate) fn replace_record(&mut self, entity: Entity) {
        let kind = entity.kind();
        self.tables
            .table_mut(kind)
            .insert(entity.id().to_string(), Arc::new(entity));
    }

    /// Insert `id` into `parent`'s child list at `index` (clamped; `None` appends)
    pub(crate) fn link_child(&mut self, parent: &str, id: &str, index: Option<usize>) -> usize {
        let kids = Arc::make_mut(&mut self.children)
            .entry(parent.to_string())
            .or_default();
        let at = index.unwrap_or(kids.len()).min(kids.len());
        kids.insert(at, id.to_string());
        Arc::make_mut(&mut self.parents).insert(id.to_string(), parent.to_string());
        at
    }

    /// Remove `id` from its parent's child list; returns (parent, index)
    pub(crate) fn unlink_child(&mut self, id: &str) -> Option<(String, usize)> {
        let parent = Arc::make_mut(&mut self.parents).remove(id)?;
        let kids = Arc::make_mut(&mut self.children).get_mut(&parent)?;
        let index = kids.iter().position(|k| k == id)?;
        kids.remove(index);
        Some((parent, index))
    }

    /// Mirror a sub-range insertion into the parent range's member list.
    ///
    /// Without an explicit `slot` the member goes just before the next owned
    /// sibling, or at the end. Call after `link_child`.
    pub(crate) fn link_range_member(&mut self, parent: &str, id: &str, slot: Option<usize>) -> Option<usize> {
        if self.get_entity_type(id) != Some(EntityKind::Range) {
            return None;
        }
        let Some(Entity::Range(range)) = self.get_entity(parent) else {
            return None;
        };
        let mut range = range.clone();
        let kids = self.get_child_ids(parent);
        let position = kids.iter().position(|k| k == id);

        let at = match slot {
            Some(slot) => slot.min(range.items.len()),
            None => {
                let next_sibling = position.and_then(|p| kids.get(p + 1));
                next_sibling
                    .and_then(|sibling| {
                        range
                            .items
                            .iter()
                            .position(|item| matches!(item, RangeItemRef::Range(r) if r == sibling))
                    })
                    .unwrap_or(range.items.len())
            }
        };
        range.items.insert(at, RangeItemRef::Range(id.to_string()));
        self.replace_record(Entity::Range(range));
        Some(at)
    }

    /// Remove a sub-range from its parent range's member list; returns the slot
    pub(crate) fn unlink_range_member(&mut self, parent: &str, id: &str) -> Option<usize> {
        let Some(Entity::Range(range)) = self.get_entity(parent) else {
            return None;
        };
        let mut range = range.clone();
        let slot = range
            .items
            .iter()
            .position(|item| matches!(item, RangeItemRef::Range(r) if r == id))?;
        range.items.remove(slot);
        self.replace_record(Entity::Range(range));
        Some(slot)
    }

    pub(crate) fn index_reference(&mut self, source: &str, target: &str) {
        Arc::make_mut(&mut self.referrers)
            .entry(target.to_string())
            .or_default()
            .insert(source.to_string());
    }

    pub(crate) fn unindex_reference(&mut self, source: &str, target: &str) {
        let referrers = Arc::make_mut(&mut self.referrers);
        if let Some(sources) = referrers.get_mut(target) {
            sources.remove(source);
            if sources.is_empty() {
                referrers.remove(target);
            }
        }
    }

    /// Outgoing non-owning references held by a live entity
    pub(crate) fn outgoing_references(&self, id: &str) -> Vec<String> {
        let mut out: Vec<String> = self.memberships(id).to_vec();
        if let Some(Entity::Range(range)) = self.get_entity(id) {
            out.extend(range.items.iter().filter_map(|item| match item {
                RangeItemRef::Canvas(c) => Some(c.clone()),
                RangeItemRef::Range(_) => None,
            }));
        }
        out
    }
}
