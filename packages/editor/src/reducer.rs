//! # Mutation Reducer
//!
//! `reduce(state, action)` validates one [`Action`] against the current
//! [`State`] and, if every check passes, applies it through the store's
//! write primitives.
//!
//! ## Guarantees
//!
//! - Checks run before the first store primitive is called, except those
//!   that need a grafted subtree in place; these run against the candidate
//!   state before it is returned. Store primitives never touch their input,
//!   so a rejected action leaves the caller's state exactly as it was.
//! - The reducer never panics out: an unexpected fault is caught at the
//!   boundary and returned as [`ReduceError::Internal`].
//! - Every success carries an ordered list of [`Change`] records.
//!
//! Batch restore and empty trash apply what they can; per-item failures are
//! returned in [`Reduction::item_errors`] and the reduction is not a success
//! unless that list is empty. Batch update is all-or-nothing.

use crate::actions::{Action, PropertyChanges};
use crate::errors::ReduceError;
use folio_model::{
    Annotation, AnnotationEntity, Canvas, Dimensions, Entity, EntityKind, Motivation, PageEntity, PagePurpose,
    Properties, RangeEntity, RangeItemRef, Resource,
};
use folio_store::{EntityPatch, RestoreOptions, State};
use folio_validator::formats;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

pub type ReduceResult<T> = Result<T, ReduceError>;

/// One audited property change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub entity_id: String,
    pub property: String,
    pub old_value: Value,
    pub new_value: Value,
}

impl Change {
    fn new(entity_id: &str, property: &str, old_value: Value, new_value: Value) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            property: property.to_string(),
            old_value,
            new_value,
        }
    }

    fn list(entity_id: &str, property: &str, old: &[String], new: &[String]) -> Self {
        Self::new(entity_id, property, json!(old), json!(new))
    }
}

/// A batch item that could not be applied
#[derive(Debug, Clone, PartialEq)]
pub struct ItemError {
    pub id: String,
    pub error: ReduceError,
}

/// Successful outcome of one reduction
#[derive(Debug, Clone)]
pub struct Reduction {
    pub state: State,
    pub changes: Vec<Change>,
    pub item_errors: Vec<ItemError>,
}

impl Reduction {
    fn new(state: State, changes: Vec<Change>) -> Self {
        Self {
            state,
            changes,
            item_errors: Vec::new(),
        }
    }

    /// False when a batch committed only some of its items
    pub fn is_success(&self) -> bool {
        self.item_errors.is_empty()
    }
}

/// Validate and apply one action
pub fn reduce(state: &State, action: &Action) -> ReduceResult<Reduction> {
    match panic::catch_unwind(AssertUnwindSafe(|| apply(state, action))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(action = action.type_name(), error = %message, "Reducer fault");
            Err(ReduceError::Internal(message))
        }
    }
}

/// Decode a raw JSON action and reduce it
pub fn reduce_value(state: &State, value: &Value) -> ReduceResult<Reduction> {
    let Some(tag) = value.get("type").and_then(Value::as_str) else {
        return Err(ReduceError::Validation("Action is missing its 'type' tag".to_string()));
    };
    if !Action::TYPES.contains(&tag) {
        return Err(ReduceError::UnknownAction(tag.to_string()));
    }

    let action: Action = serde_json::from_value(value.clone())
        .map_err(|e| ReduceError::Validation(format!("Malformed {} payload: {}", tag, e)))?;
    reduce(state, &action)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "reducer panicked".to_string()
    }
}

fn apply(state: &State, action: &Action) -> ReduceResult<Reduction> {
    let reduction = match action {
        Action::UpdateLabel { id, label } => {
            let label = formats::parse_language_map("label", label)?;
            let patch = EntityPatch {
                label: Some(Some(label)),
                ..Default::default()
            };
            patch_entity(state, id, &patch)
        }
        Action::UpdateSummary { id, summary } => {
            let summary = match summary {
                Value::Null => None,
                value => Some(formats::parse_language_map("summary", value)?),
            };
            let patch = EntityPatch {
                summary: Some(summary),
                ..Default::default()
            };
            patch_entity(state, id, &patch)
        }
        Action::UpdateMetadata { id, metadata } => {
            let patch = EntityPatch {
                metadata: Some(formats::parse_metadata(metadata)?),
                ..Default::default()
            };
            patch_entity(state, id, &patch)
        }
        Action::UpdateRights { id, rights } => {
            if let Some(rights) = rights {
                formats::check_rights(rights)?;
            }
            let patch = EntityPatch {
                rights: Some(rights.clone()),
                ..Default::default()
            };
            patch_entity(state, id, &patch)
        }
        Action::UpdateNavDate { id, nav_date } => {
            if let Some(nav_date) = nav_date {
                formats::check_nav_date(nav_date)?;
            }
            let patch = EntityPatch {
                nav_date: Some(nav_date.clone()),
                ..Default::default()
            };
            patch_entity(state, id, &patch)
        }
        Action::UpdateBehavior { id, behavior } => {
            let kind = require(state, id)?.kind();
            let patch = EntityPatch {
                behavior: Some(formats::parse_behaviors(kind, behavior)?),
                ..Default::default()
            };
            patch_entity(state, id, &patch)
        }
        Action::UpdateViewingDirection {
            id,
            viewing_direction,
        } => {
            let kind = require(state, id)?.kind();
            let direction = match viewing_direction {
                Some(value) => Some(formats::parse_viewing_direction(kind, value)?),
                None => None,
            };
            let patch = EntityPatch {
                viewing_direction: Some(direction),
                ..Default::default()
            };
            patch_entity(state, id, &patch)
        }
        Action::UpdateCanvasDimensions {
            id,
            width,
            height,
            duration,
        } => {
            require_kind(state, id, EntityKind::Canvas)?;
            check_dimensions(id, Some(*width), Some(*height), *duration)?;
            let patch = EntityPatch {
                dimensions: Some(Dimensions {
                    width: Some(*width),
                    height: Some(*height),
                    duration: *duration,
                }),
                ..Default::default()
            };
            patch_entity(state, id, &patch)
        }
        Action::BatchUpdate { ids, changes } => batch_update(state, ids, changes),

        Action::AddCanvas {
            manifest_id,
            canvas,
            index,
        } => add_canvas(state, manifest_id, canvas, *index),
        Action::RemoveCanvas {
            manifest_id,
            canvas_id,
        } => remove_canvas(state, manifest_id, canvas_id),
        Action::ReorderCanvases { manifest_id, order } => reorder_canvases(state, manifest_id, order),
        Action::AddAnnotation {
            canvas_id,
            annotation,
        } => add_annotation(state, canvas_id, annotation),
        Action::RemoveAnnotation {
            canvas_id,
            annotation_id,
        } => remove_annotation(state, canvas_id, annotation_id),
        Action::AddItem {
            parent_id,
            item,
            index,
        } => add_item(state, parent_id, item, *index),
        Action::MoveItem {
            id,
            new_parent_id,
            index,
        } => move_item(state, id, new_parent_id, *index),
        Action::ReorderChildren { parent_id, order } => reorder_children(state, parent_id, order),
        Action::CreateRange {
            parent_id,
            id,
            label,
            canvas_ids,
            index,
        } => create_range(state, parent_id, id, label.as_ref(), canvas_ids, *index),
        Action::UpdateRangeItems { range_id, items } => update_range_items(state, range_id, items),
        Action::AddMembership {
            collection_id,
            manifest_id,
        } => add_membership(state, collection_id, manifest_id),
        Action::RemoveMembership {
            collection_id,
            manifest_id,
        } => remove_membership(state, collection_id, manifest_id),

        Action::MoveToTrash { id } => move_to_trash(state, id),
        Action::RestoreFromTrash {
            id,
            parent_id,
            index,
        } => restore(state, id, parent_id.as_deref(), *index),
        Action::EmptyTrash => empty_trash(state),
        Action::BatchRestore { ids } => batch_restore(state, ids),
    }?;

    debug!(
        action = action.type_name(),
        changes = reduction.changes.len(),
        failed_items = reduction.item_errors.len(),
        "Action reduced"
    );
    Ok(reduction)
}

// ---------------------------------------------------------------------------
// Shared checks
// ---------------------------------------------------------------------------

fn require<'a>(state: &'a State, id: &str) -> ReduceResult<&'a Entity> {
    state
        .get_entity(id)
        .ok_or_else(|| ReduceError::NotFound(id.to_string()))
}

fn require_kind<'a>(state: &'a State, id: &str, kind: EntityKind) -> ReduceResult<&'a Entity> {
    let entity = require(state, id)?;
    if entity.kind() != kind {
        return Err(ReduceError::StructuralViolation(format!(
            "'{}' is a {}, not a {}",
            id,
            entity.kind(),
            kind
        )));
    }
    Ok(entity)
}

/// Ownership compatibility matrix check
fn check_compatible(parent_id: &str, parent: EntityKind, child_id: &str, child: EntityKind) -> ReduceResult<()> {
    if parent.can_contain(child) {
        return Ok(());
    }
    Err(ReduceError::StructuralViolation(format!(
        "{} '{}' cannot be placed under {} '{}'; a {} may only contain: {}",
        child,
        child_id,
        parent,
        parent_id,
        parent,
        parent.describe_children()
    )))
}

/// An explicit index may point at any slot up to and including the end
fn check_index(index: usize, len: usize) -> ReduceResult<()> {
    if index > len {
        return Err(ReduceError::Validation(format!(
            "Index {} is out of bounds; expected 0..={}",
            index, len
        )));
    }
    Ok(())
}

/// `order` must list every id of `current` exactly once and nothing else
fn check_permutation(parent_id: &str, current: &[String], order: &[String]) -> ReduceResult<()> {
    let mut seen = HashSet::new();
    if let Some(repeated) = order.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(ReduceError::Validation(format!(
            "New order for '{}' lists '{}' more than once",
            parent_id, repeated
        )));
    }

    let existing: HashSet<&str> = current.iter().map(String::as_str).collect();
    if let Some(extra) = order.iter().find(|id| !existing.contains(id.as_str())) {
        return Err(ReduceError::Validation(format!(
            "New order for '{}' contains '{}', which is not one of its children",
            parent_id, extra
        )));
    }
    if let Some(missing) = current.iter().find(|id| !seen.contains(id.as_str())) {
        return Err(ReduceError::Validation(format!(
            "New order for '{}' omits '{}'",
            parent_id, missing
        )));
    }
    Ok(())
}

fn check_dimensions(id: &str, width: Option<u32>, height: Option<u32>, duration: Option<f64>) -> ReduceResult<()> {
    if width.unwrap_or(0) == 0 || height.unwrap_or(0) == 0 {
        return Err(ReduceError::Validation(format!(
            "Canvas '{}' needs a positive width and height",
            id
        )));
    }
    if duration.is_some_and(|d| !d.is_finite() || d <= 0.0) {
        return Err(ReduceError::Validation(format!(
            "Canvas '{}' duration must be a positive number of seconds",
            id
        )));
    }
    Ok(())
}

fn children_of(state: &State, id: &str) -> Vec<String> {
    state.get_child_ids(id).to_vec()
}

fn children_of_kind(state: &State, id: &str, kind: EntityKind) -> Vec<String> {
    state
        .get_child_ids(id)
        .iter()
        .filter(|child| state.get_entity_type(child) == Some(kind))
        .cloned()
        .collect()
}

/// The manifest a range (or range parent) belongs to
fn owning_manifest(state: &State, id: &str) -> Option<String> {
    if state.get_entity_type(id) == Some(EntityKind::Manifest) {
        return Some(id.to_string());
    }
    state
        .get_ancestors(id)
        .into_iter()
        .find(|a| state.get_entity_type(a) == Some(EntityKind::Manifest))
}

fn check_canvas_in_manifest(state: &State, manifest_id: Option<&str>, canvas_id: &str) -> ReduceResult<()> {
    require_kind(state, canvas_id, EntityKind::Canvas)?;
    if let Some(manifest) = manifest_id {
        if state.get_parent_id(canvas_id) != Some(manifest) {
            return Err(ReduceError::StructuralViolation(format!(
                "Canvas '{}' is not part of Manifest '{}'",
                canvas_id, manifest
            )));
        }
    }
    Ok(())
}

/// A page takes annotations matching its declared purpose; painting pages
/// take painting only, mixed pages take anything but painting
fn check_page_accepts(
    page_id: &str,
    purpose: PagePurpose,
    annotation_id: &str,
    motivation: Motivation,
) -> ReduceResult<()> {
    let accepted = match purpose {
        PagePurpose::Mixed => !motivation.is_primary(),
        declared => declared == PagePurpose::for_motivation(motivation),
    };
    if accepted {
        return Ok(());
    }

    let holds = match purpose {
        PagePurpose::Painting => "painting",
        PagePurpose::Motivated(declared) => declared.as_str(),
        PagePurpose::Mixed => "non-painting",
    };
    Err(ReduceError::StructuralViolation(format!(
        "Annotation '{}' ({}) cannot join page '{}', which holds {} annotations",
        annotation_id, motivation, page_id, holds
    )))
}

/// Every annotation under `page_id` fits the page; non-pages pass
fn check_page_contents(state: &State, page_id: &str) -> ReduceResult<()> {
    let Some(Entity::AnnotationPage(page)) = state.get_entity(page_id) else {
        return Ok(());
    };
    for child in state.get_child_ids(page_id) {
        if let Some(Entity::Annotation(annotation)) = state.get_entity(child) {
            check_page_accepts(page_id, page.purpose, &annotation.id, annotation.motivation)?;
        }
    }
    Ok(())
}

/// A range (and its sub-ranges) may only point at canvases of `manifest`
fn check_range_canvases(state: &State, range_id: &str, manifest: Option<&str>) -> ReduceResult<()> {
    let mut ranges = vec![range_id.to_string()];
    ranges.extend(state.get_descendants(range_id));
    for range in &ranges {
        let Some(Entity::Range(entity)) = state.get_entity(range) else {
            continue;
        };
        for item in &entity.items {
            let RangeItemRef::Canvas(canvas) = item else {
                continue;
            };
            // Trashed canvases are checked again when restored
            if state.contains(canvas) && state.get_parent_id(canvas) != manifest {
                return Err(ReduceError::StructuralViolation(format!(
                    "Range '{}' points at Canvas '{}', which is not part of Manifest '{}'",
                    range,
                    canvas,
                    manifest.unwrap_or_default()
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Property updates
// ---------------------------------------------------------------------------

/// Flattened comparable view of an entity's fields
fn fields(entity: &Entity) -> Map<String, Value> {
    let mut out = Map::new();
    if let Ok(Value::Object(mut record)) = serde_json::to_value(entity) {
        if let Some(Value::Object(props)) = record.remove("props") {
            out.extend(props);
        }
        record.remove("type");
        record.remove("id");
        out.extend(record);
    }
    out
}

fn diff_entity(before: &Entity, after: &Entity) -> Vec<Change> {
    let old = fields(before);
    let new = fields(after);

    let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter_map(|key| {
            let old_value = old.get(key).cloned().unwrap_or(Value::Null);
            let new_value = new.get(key).cloned().unwrap_or(Value::Null);
            (old_value != new_value).then(|| Change::new(after.id(), key, old_value, new_value))
        })
        .collect()
}

fn patch_entity(state: &State, id: &str, patch: &EntityPatch) -> ReduceResult<Reduction> {
    let before = require(state, id)?;
    let next = state.update_entity(id, patch)?;
    let changes = match next.get_entity(id) {
        Some(after) => diff_entity(before, after),
        None => Vec::new(),
    };
    Ok(Reduction::new(next, changes))
}

/// Patch for one entity kind; behaviors and viewing direction are kind-checked
fn batch_patch(kind: EntityKind, changes: &PropertyChanges) -> ReduceResult<EntityPatch> {
    let mut patch = EntityPatch::default();

    if let Some(label) = &changes.label {
        patch.label = Some(Some(formats::parse_language_map("label", label)?));
    }
    if let Some(summary) = &changes.summary {
        patch.summary = Some(match summary {
            Value::Null => None,
            value => Some(formats::parse_language_map("summary", value)?),
        });
    }
    if let Some(metadata) = &changes.metadata {
        patch.metadata = Some(formats::parse_metadata(metadata)?);
    }
    if let Some(rights) = &changes.rights {
        formats::check_rights(rights)?;
        patch.rights = Some(Some(rights.clone()));
    }
    if let Some(nav_date) = &changes.nav_date {
        formats::check_nav_date(nav_date)?;
        patch.nav_date = Some(Some(nav_date.clone()));
    }
    if let Some(behavior) = &changes.behavior {
        patch.behavior = Some(formats::parse_behaviors(kind, behavior)?);
    }
    if let Some(direction) = &changes.viewing_direction {
        patch.viewing_direction = Some(Some(formats::parse_viewing_direction(kind, direction)?));
    }

    Ok(patch)
}

fn batch_update(state: &State, ids: &[String], changes: &PropertyChanges) -> ReduceResult<Reduction> {
    if ids.is_empty() {
        return Err(ReduceError::Validation("BatchUpdate needs at least one id".to_string()));
    }
    if *changes == PropertyChanges::default() {
        return Err(ReduceError::Validation("BatchUpdate has no changes".to_string()));
    }

    // Every id is validated before the first write
    let mut patches = Vec::with_capacity(ids.len());
    for id in ids {
        let kind = require(state, id)?.kind();
        let patch = batch_patch(kind, changes).map_err(|e| match e {
            ReduceError::Validation(message) => ReduceError::Validation(format!("{}: {}", id, message)),
            other => other,
        })?;
        patches.push((id, patch));
    }

    let mut next = state.clone();
    let mut audit = Vec::new();
    for (id, patch) in patches {
        let reduction = patch_entity(&next, id, &patch)?;
        next = reduction.state;
        audit.extend(reduction.changes);
    }
    Ok(Reduction::new(next, audit))
}

// ---------------------------------------------------------------------------
// Canvases and annotations
// ---------------------------------------------------------------------------

fn add_canvas(state: &State, manifest_id: &str, canvas: &Canvas, index: Option<usize>) -> ReduceResult<Reduction> {
    require_kind(state, manifest_id, EntityKind::Manifest)?;
    check_dimensions(
        &canvas.id,
        canvas.dimensions.width,
        canvas.dimensions.height,
        canvas.dimensions.duration,
    )?;

    // Canvases and ranges share the manifest's child list; `index` counts canvases only
    let children = children_of(state, manifest_id);
    let canvas_slots: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, child)| state.get_entity_type(child) == Some(EntityKind::Canvas))
        .map(|(slot, _)| slot)
        .collect();
    let after_last = canvas_slots.last().map_or(0, |slot| slot + 1);
    let slot = match index {
        Some(index) => {
            check_index(index, canvas_slots.len())?;
            canvas_slots.get(index).copied().unwrap_or(after_last)
        }
        None => after_last,
    };

    let before = children_of_kind(state, manifest_id, EntityKind::Canvas);
    let next = state.insert_subtree(Some(manifest_id), Some(slot), &Resource::Canvas(canvas.clone()))?;
    let after = children_of_kind(&next, manifest_id, EntityKind::Canvas);

    Ok(Reduction::new(next, vec![Change::list(manifest_id, "items", &before, &after)]))
}

fn remove_canvas(state: &State, manifest_id: &str, canvas_id: &str) -> ReduceResult<Reduction> {
    require_kind(state, manifest_id, EntityKind::Manifest)?;
    check_canvas_in_manifest(state, Some(manifest_id), canvas_id)?;

    let before = children_of_kind(state, manifest_id, EntityKind::Canvas);
    let next = state.remove_entity(canvas_id)?;
    let after = children_of_kind(&next, manifest_id, EntityKind::Canvas);

    Ok(Reduction::new(next, vec![Change::list(manifest_id, "items", &before, &after)]))
}

fn reorder_canvases(state: &State, manifest_id: &str, order: &[String]) -> ReduceResult<Reduction> {
    require_kind(state, manifest_id, EntityKind::Manifest)?;
    let before = children_of_kind(state, manifest_id, EntityKind::Canvas);
    check_permutation(manifest_id, &before, order)?;

    // Ranges keep their slots; canvas slots take the new order
    let mut reordered = order.iter();
    let children: Vec<String> = state
        .get_child_ids(manifest_id)
        .iter()
        .map(|child| {
            if state.get_entity_type(child) == Some(EntityKind::Canvas) {
                reordered.next().cloned().unwrap_or_else(|| child.clone())
            } else {
                child.clone()
            }
        })
        .collect();

    let next = state.reorder_children(manifest_id, children)?;
    Ok(Reduction::new(next, vec![Change::list(manifest_id, "items", &before, order)]))
}

/// Synthesized page id for a canvas and purpose; stable across calls
fn synthesized_page_id(canvas_id: &str, annotation: &Annotation) -> String {
    format!("{}/page/{}", canvas_id, annotation.motivation.as_str())
}

fn add_annotation(state: &State, canvas_id: &str, annotation: &Annotation) -> ReduceResult<Reduction> {
    require_kind(state, canvas_id, EntityKind::Canvas)?;

    let mut annotation = annotation.clone();
    if annotation.target.is_empty() {
        annotation.target = canvas_id.to_string();
    } else if !annotation.target.starts_with(canvas_id) {
        return Err(ReduceError::Validation(format!(
            "Annotation '{}' targets '{}', not canvas '{}'",
            annotation.id, annotation.target, canvas_id
        )));
    }

    let purpose = PagePurpose::for_motivation(annotation.motivation);
    let existing = state.get_child_ids(canvas_id).iter().find(|page| {
        matches!(state.get_entity(page), Some(Entity::AnnotationPage(p)) if p.purpose == purpose)
    });

    let mut next = state.clone();
    let mut changes = Vec::new();
    let synthesized = synthesized_page_id(canvas_id, &annotation);
    // A page already holding the synthesized id is reused when it fits
    let adoptable = state.get_parent_id(&synthesized) == Some(canvas_id)
        && match state.get_entity(&synthesized) {
            Some(Entity::AnnotationPage(p)) => {
                check_page_accepts(&p.id, p.purpose, &annotation.id, annotation.motivation).is_ok()
            }
            _ => false,
        };

    let page_id = match existing {
        Some(page) => page.clone(),
        None if adoptable => synthesized,
        None => {
            let page_id = synthesized;
            if state.contains(&page_id) || state.is_trashed(&page_id) {
                return Err(ReduceError::StructuralViolation(format!(
                    "Cannot create annotation page '{}': the id is already in use",
                    page_id
                )));
            }
            let page = Entity::AnnotationPage(PageEntity {
                id: page_id.clone(),
                props: Properties::default(),
                purpose,
                declared: true,
            });
            let before = children_of(&next, canvas_id);
            next = next.add_entity(page, Some(canvas_id))?;
            let property = if purpose.is_primary() { "items" } else { "annotations" };
            changes.push(Change::list(canvas_id, property, &before, &children_of(&next, canvas_id)));
            page_id
        }
    };

    let before = children_of(&next, &page_id);
    next = next.add_entity(Entity::Annotation(AnnotationEntity::from(&annotation)), Some(&page_id))?;
    changes.push(Change::list(&page_id, "items", &before, &children_of(&next, &page_id)));

    Ok(Reduction::new(next, changes))
}

fn remove_annotation(state: &State, canvas_id: &str, annotation_id: &str) -> ReduceResult<Reduction> {
    require_kind(state, canvas_id, EntityKind::Canvas)?;
    require_kind(state, annotation_id, EntityKind::Annotation)?;

    let page_id = state.get_parent_id(annotation_id).unwrap_or_default().to_string();
    if state.get_parent_id(&page_id) != Some(canvas_id) {
        return Err(ReduceError::StructuralViolation(format!(
            "Annotation '{}' does not belong to canvas '{}'",
            annotation_id, canvas_id
        )));
    }

    let before = children_of(state, &page_id);
    let next = state.remove_entity(annotation_id)?;
    let after = children_of(&next, &page_id);
    Ok(Reduction::new(next, vec![Change::list(&page_id, "items", &before, &after)]))
}

// ---------------------------------------------------------------------------
// Generic structure
// ---------------------------------------------------------------------------

fn add_item(state: &State, parent_id: &str, item: &Resource, index: Option<usize>) -> ReduceResult<Reduction> {
    let parent = require(state, parent_id)?;
    check_compatible(parent_id, parent.kind(), item.id(), item.kind())?;
    if let (Entity::AnnotationPage(page), Resource::Annotation(annotation)) = (parent, item) {
        check_page_accepts(parent_id, page.purpose, &annotation.id, annotation.motivation)?;
    }
    let before = children_of(state, parent_id);
    if let Some(index) = index {
        check_index(index, before.len())?;
    }

    let next = state.insert_subtree(Some(parent_id), index, item)?;
    // Pages inside the graft get their purpose from placement or declaration
    check_page_contents(&next, item.id())?;
    for descendant in next.get_descendants(item.id()) {
        check_page_contents(&next, &descendant)?;
    }
    if item.kind() == EntityKind::Range {
        check_range_canvases(&next, item.id(), owning_manifest(&next, parent_id).as_deref())?;
    }
    let after = children_of(&next, parent_id);
    Ok(Reduction::new(next, vec![Change::list(parent_id, "children", &before, &after)]))
}

fn move_item(state: &State, id: &str, new_parent_id: &str, index: Option<usize>) -> ReduceResult<Reduction> {
    let entity = require(state, id)?;
    let parent = require(state, new_parent_id)?;
    let kind = entity.kind();
    check_compatible(new_parent_id, parent.kind(), id, kind)?;

    match (parent, entity) {
        (Entity::AnnotationPage(page), Entity::Annotation(annotation)) => {
            check_page_accepts(new_parent_id, page.purpose, id, annotation.motivation)?;
        }
        (_, Entity::Range(_)) => {
            let target = owning_manifest(state, new_parent_id);
            if target != owning_manifest(state, id) {
                check_range_canvases(state, id, target.as_deref())?;
            }
        }
        _ => {}
    }

    let siblings = state
        .get_child_ids(new_parent_id)
        .iter()
        .filter(|child| *child != id)
        .count();
    if let Some(index) = index {
        check_index(index, siblings)?;
    }

    let old_parent = state.get_parent_id(id).map(str::to_string);
    let next = state.move_entity(id, new_parent_id, index)?;

    let mut changes = vec![Change::new(id, "parent", json!(old_parent), json!(new_parent_id))];
    if let Some(old_parent) = old_parent.as_deref().filter(|p| *p != new_parent_id) {
        changes.push(Change::list(
            old_parent,
            "children",
            state.get_child_ids(old_parent),
            next.get_child_ids(old_parent),
        ));
    }
    changes.push(Change::list(
        new_parent_id,
        "children",
        state.get_child_ids(new_parent_id),
        next.get_child_ids(new_parent_id),
    ));
    Ok(Reduction::new(next, changes))
}

fn reorder_children(state: &State, parent_id: &str, order: &[String]) -> ReduceResult<Reduction> {
    require(state, parent_id)?;
    let before = children_of(state, parent_id);
    check_permutation(parent_id, &before, order)?;

    let next = state.reorder_children(parent_id, order.to_vec())?;
    Ok(Reduction::new(next, vec![Change::list(parent_id, "children", &before, order)]))
}

// ---------------------------------------------------------------------------
// Ranges and memberships
// ---------------------------------------------------------------------------

fn create_range(
    state: &State,
    parent_id: &str,
    id: &str,
    label: Option<&Value>,
    canvas_ids: &[String],
    index: Option<usize>,
) -> ReduceResult<Reduction> {
    let parent_kind = require(state, parent_id)?.kind();
    check_compatible(parent_id, parent_kind, id, EntityKind::Range)?;

    let manifest = owning_manifest(state, parent_id);
    for canvas in canvas_ids {
        check_canvas_in_manifest(state, manifest.as_deref(), canvas)?;
    }

    let mut props = Properties::default();
    if let Some(label) = label {
        props.label = Some(formats::parse_language_map("label", label)?);
    }

    let before = children_of(state, parent_id);
    if let Some(index) = index {
        check_index(index, before.len())?;
    }

    let range = Entity::Range(RangeEntity {
        id: id.to_string(),
        props,
        items: canvas_ids.iter().cloned().map(RangeItemRef::Canvas).collect(),
    });
    let next = state.insert_entity(range, Some(parent_id), index)?;
    let after = children_of(&next, parent_id);

    let property = if parent_kind == EntityKind::Manifest { "structures" } else { "items" };
    Ok(Reduction::new(next, vec![Change::list(parent_id, property, &before, &after)]))
}

fn update_range_items(state: &State, range_id: &str, items: &[RangeItemRef]) -> ReduceResult<Reduction> {
    require_kind(state, range_id, EntityKind::Range)?;

    // Sub-ranges are owned; the list may reorder them but not add or drop any
    let nested: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            RangeItemRef::Range(id) => Some(id.clone()),
            RangeItemRef::Canvas(_) => None,
        })
        .collect();
    check_permutation(range_id, state.get_child_ids(range_id), &nested)?;

    let manifest = owning_manifest(state, range_id);
    for item in items {
        if let RangeItemRef::Canvas(canvas) = item {
            check_canvas_in_manifest(state, manifest.as_deref(), canvas)?;
        }
    }

    patch_range(state, range_id, items)
}

fn patch_range(state: &State, range_id: &str, items: &[RangeItemRef]) -> ReduceResult<Reduction> {
    let before = require(state, range_id)?;
    let next = state.set_range_items(range_id, items.to_vec())?;
    let changes = match next.get_entity(range_id) {
        Some(after) => diff_entity(before, after),
        None => Vec::new(),
    };
    Ok(Reduction::new(next, changes))
}

fn add_membership(state: &State, collection_id: &str, manifest_id: &str) -> ReduceResult<Reduction> {
    require_kind(state, collection_id, EntityKind::Collection)?;
    require_kind(state, manifest_id, EntityKind::Manifest)?;
    if state.get_parent_id(manifest_id) == Some(collection_id) {
        return Err(ReduceError::StructuralViolation(format!(
            "Manifest '{}' is already owned by Collection '{}'",
            manifest_id, collection_id
        )));
    }

    let before = state.memberships(collection_id).to_vec();
    let next = state.add_membership(collection_id, manifest_id)?;
    let after = next.memberships(collection_id).to_vec();

    let changes = if before == after {
        Vec::new()
    } else {
        vec![Change::list(collection_id, "members", &before, &after)]
    };
    Ok(Reduction::new(next, changes))
}

fn remove_membership(state: &State, collection_id: &str, manifest_id: &str) -> ReduceResult<Reduction> {
    require_kind(state, collection_id, EntityKind::Collection)?;

    let before = state.memberships(collection_id).to_vec();
    let next = state.remove_membership(collection_id, manifest_id)?;
    let after = next.memberships(collection_id).to_vec();
    Ok(Reduction::new(next, vec![Change::list(collection_id, "members", &before, &after)]))
}

// ---------------------------------------------------------------------------
// Trash
// ---------------------------------------------------------------------------

fn move_to_trash(state: &State, id: &str) -> ReduceResult<Reduction> {
    require(state, id)?;
    let parent = state.get_parent_id(id).unwrap_or_default().to_string();

    let next = state.move_entity_to_trash(id)?;
    let changes = vec![
        Change::new(id, "trashed", json!(false), json!(true)),
        Change::list(&parent, "children", state.get_child_ids(&parent), next.get_child_ids(&parent)),
    ];
    Ok(Reduction::new(next, changes))
}

fn restore(state: &State, id: &str, parent_id: Option<&str>, index: Option<usize>) -> ReduceResult<Reduction> {
    let target_parent = match (state.trash_entry(id), parent_id) {
        (Some(entry), Some(parent)) => {
            let parent_kind = require(state, parent)?.kind();
            check_compatible(parent, parent_kind, id, entry.kind)?;
            Some(parent.to_string())
        }
        (Some(entry), None) => Some(entry.parent_id.clone()),
        // The store reports the precise reason
        (None, _) => None,
    };
    if let (Some(parent), Some(index)) = (&target_parent, index) {
        if state.contains(parent) {
            check_index(index, state.get_child_ids(parent).len())?;
        }
    }

    let options = RestoreOptions {
        parent_id: parent_id.map(str::to_string),
        index,
    };
    let next = state.restore_entity_from_trash(id, &options)?;

    let mut changes = vec![Change::new(id, "trashed", json!(true), json!(false))];
    if let Some(parent) = target_parent {
        changes.push(Change::list(&parent, "children", state.get_child_ids(&parent), next.get_child_ids(&parent)));
    }
    Ok(Reduction::new(next, changes))
}

fn batch_restore(state: &State, ids: &[String]) -> ReduceResult<Reduction> {
    if ids.is_empty() {
        return Err(ReduceError::Validation("BatchRestore needs at least one id".to_string()));
    }

    let mut next = state.clone();
    let mut changes = Vec::new();
    let mut item_errors = Vec::new();
    for id in ids {
        match restore(&next, id, None, None) {
            Ok(reduction) => {
                next = reduction.state;
                changes.extend(reduction.changes);
            }
            Err(error) => {
                warn!(id = %id, error = %error, "Restore failed");
                item_errors.push(ItemError {
                    id: id.clone(),
                    error,
                });
            }
        }
    }

    if item_errors.len() == ids.len() {
        return Err(item_errors.swap_remove(0).error);
    }
    Ok(Reduction {
        state: next,
        changes,
        item_errors,
    })
}

fn empty_trash(state: &State) -> ReduceResult<Reduction> {
    let roots: Vec<String> = state.trash_entries().map(|entry| entry.id.clone()).collect();
    let (next, failures) = state.empty_trash();

    if !roots.is_empty() && failures.len() == roots.len() {
        if let Some(first) = failures.first() {
            return Err(first.error.clone().into());
        }
    }

    let failed: HashSet<&str> = failures.iter().map(|f| f.id.as_str()).collect();
    let changes = roots
        .iter()
        .filter(|id| !failed.contains(id.as_str()))
        .map(|id| Change::new(id, "purged", json!(false), json!(true)))
        .collect();
    let item_errors = failures
        .into_iter()
        .map(|failure| ItemError {
            id: failure.id,
            error: failure.error.into(),
        })
        .collect();

    Ok(Reduction {
        state: next,
        changes,
        item_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions;
    use folio_model::{
        AnnotationPage, Behavior, Collection, CollectionItem, LanguageMap, Manifest, Motivation, Range,
    };
    use folio_store::normalize;

    fn painted(id: &str) -> Canvas {
        Canvas::new(id, 100, 100).with_page(AnnotationPage::new(format!("{}/p1", id)).with_annotation(
            Annotation::new(format!("{}/img", id), Motivation::Painting, id, json!({"type": "Image"})),
        ))
    }

    fn state() -> State {
        let m1 = Manifest::new("m1")
            .with_label("en", "Book")
            .with_canvas(painted("c1"))
            .with_canvas(painted("c2"))
            .with_canvas(painted("c3"))
            .with_range(Range::new("r1").with_canvas_ref("c1").with_range(Range::new("r2")));
        let m2 = Manifest::new("m2").with_canvas(painted("d1"));
        let root = Collection::new("g1")
            .with_item(CollectionItem::Manifest(m1))
            .with_item(CollectionItem::Manifest(m2));
        normalize(&Resource::Collection(root)).unwrap()
    }

    fn note(id: &str, target: &str) -> Annotation {
        Annotation::new(id, Motivation::Commenting, target, json!({"type": "TextualBody", "value": "note"}))
    }

    #[test]
    fn test_label_update_records_change() {
        let s = state();
        let r = reduce(&s, &actions::update_label("m1", &LanguageMap::single("fr", "Livre"))).unwrap();

        assert_eq!(r.changes.len(), 1);
        assert_eq!(r.changes[0].property, "label");
        assert_eq!(r.changes[0].old_value, json!({"en": ["Book"]}));
        assert_eq!(r.changes[0].new_value, json!({"fr": ["Livre"]}));
    }

    #[test]
    fn test_malformed_label_is_rejected() {
        let s = state();
        let action = Action::UpdateLabel {
            id: "m1".to_string(),
            label: json!({"en": "not a list"}),
        };
        assert!(matches!(reduce(&s, &action), Err(ReduceError::Validation(_))));

        let action = Action::UpdateLabel {
            id: "m1".to_string(),
            label: json!(["en", "Book"]),
        };
        assert!(matches!(reduce(&s, &action), Err(ReduceError::Validation(_))));
    }

    #[test]
    fn test_rights_and_nav_date_formats() {
        let s = state();
        assert!(reduce(&s, &actions::update_rights("m1", Some("not a uri"))).is_err());
        assert!(reduce(&s, &actions::update_rights("m1", Some("http://rightsstatements.org/vocab/NoC-US/1.0/"))).is_ok());
        assert!(reduce(&s, &actions::update_nav_date("m1", Some("last tuesday"))).is_err());
        assert!(reduce(&s, &actions::update_nav_date("m1", Some("1856-01-01T00:00:00Z"))).is_ok());
    }

    #[test]
    fn test_behavior_conflict_names_pair() {
        let s = state();
        let err = reduce(&s, &actions::update_behavior("m1", &[Behavior::Individuals, Behavior::Continuous]))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("individuals") && message.contains("continuous"), "{}", message);

        assert!(reduce(&s, &actions::update_behavior("m1", &[Behavior::Continuous])).is_ok());
    }

    #[test]
    fn test_add_canvas_index_counts_canvases_only() {
        let s = state();
        let r = reduce(&s, &actions::add_canvas("m1", painted("c9"), Some(3))).unwrap();
        // Canvases c1..c3 then the new one, range r1 stays after
        assert_eq!(r.state.get_child_ids("m1"), &["c1", "c2", "c3", "c9", "r1"]);

        let r = reduce(&s, &actions::add_canvas("m1", painted("c0"), Some(0))).unwrap();
        assert_eq!(r.state.get_child_ids("m1")[0], "c0");

        assert!(matches!(
            reduce(&s, &actions::add_canvas("m1", painted("c8"), Some(4))),
            Err(ReduceError::Validation(_))
        ));
    }

    #[test]
    fn test_reorder_canvases_keeps_ranges_in_place() {
        let s = state();
        let order = vec!["c3".to_string(), "c1".to_string(), "c2".to_string()];
        let r = reduce(&s, &actions::reorder_canvases("m1", order)).unwrap();
        assert_eq!(r.state.get_child_ids("m1"), &["c3", "c1", "c2", "r1"]);
    }

    #[test]
    fn test_reorder_rejects_non_permutations() {
        let s = state();
        let omit = vec!["c1".to_string(), "c2".to_string()];
        assert!(matches!(
            reduce(&s, &actions::reorder_canvases("m1", omit)),
            Err(ReduceError::Validation(_))
        ));

        let repeat = vec!["c1".to_string(), "c1".to_string(), "c2".to_string(), "c3".to_string(), "r1".to_string()];
        assert!(reduce(&s, &actions::reorder_children("m1", repeat)).is_err());

        let extra = vec!["d1".to_string(), "c1".to_string(), "c2".to_string(), "c3".to_string(), "r1".to_string()];
        assert!(reduce(&s, &actions::reorder_children("m1", extra)).is_err());
    }

    #[test]
    fn test_annotation_pages_are_reused_by_purpose() {
        let s = state();
        let first = reduce(&s, &actions::add_annotation("c1", note("n1", "c1"))).unwrap();
        let page = "c1/page/commenting";
        assert_eq!(first.state.get_parent_id("n1"), Some(page));

        let second = reduce(&first.state, &actions::add_annotation("c1", note("n2", "c1#xywh=0,0,10,10"))).unwrap();
        assert_eq!(second.state.get_parent_id("n2"), Some(page));
        // Painting page plus one synthesized commenting page
        assert_eq!(second.state.get_child_ids("c1").len(), 2);
    }

    #[test]
    fn test_non_primary_annotation_never_lands_on_painting_page() {
        let s = state();
        let r = reduce(&s, &actions::add_annotation("c1", note("n1", "c1"))).unwrap();
        assert_ne!(r.state.get_parent_id("n1"), Some("c1/p1"));
    }

    #[test]
    fn test_move_keeps_annotations_on_matching_pages() {
        let s = state();
        let s = reduce(&s, &actions::add_annotation("c1", note("n1", "c1"))).unwrap().state;

        assert!(matches!(
            reduce(&s, &actions::move_item("n1", "c1/p1", None)),
            Err(ReduceError::StructuralViolation(_))
        ));
        assert!(matches!(
            reduce(&s, &actions::move_item("c1/img", "c1/page/commenting", None)),
            Err(ReduceError::StructuralViolation(_))
        ));

        let r = reduce(&s, &actions::move_item("c2/img", "c1/p1", None)).unwrap();
        assert_eq!(r.state.get_child_ids("c1/p1"), &["c1/img", "c2/img"]);
    }

    #[test]
    fn test_add_item_keeps_annotations_on_matching_pages() {
        let s = state();
        assert!(matches!(
            reduce(&s, &actions::add_item("c1/p1", Resource::Annotation(note("n2", "c1")), None)),
            Err(ReduceError::StructuralViolation(_))
        ));

        let page = AnnotationPage::new("c1/p9")
            .with_purpose(PagePurpose::Painting)
            .with_annotation(note("n3", "c1"));
        assert!(matches!(
            reduce(&s, &actions::add_item("c1", Resource::AnnotationPage(page), None)),
            Err(ReduceError::StructuralViolation(_))
        ));

        let notes = AnnotationPage::new("c1/notes").with_annotation(note("n4", "c1"));
        let r = reduce(&s, &actions::add_item("c1", Resource::AnnotationPage(notes), None)).unwrap();
        assert_eq!(r.state.get_parent_id("n4"), Some("c1/notes"));
    }

    #[test]
    fn test_existing_page_with_synthesized_id_is_adopted() {
        let canvas = painted("c1").with_annotation_page(AnnotationPage::new("c1/page/commenting"));
        let s = normalize(&Resource::Manifest(Manifest::new("m1").with_canvas(canvas))).unwrap();

        let r = reduce(&s, &actions::add_annotation("c1", note("n1", "c1"))).unwrap();
        assert_eq!(r.state.get_parent_id("n1"), Some("c1/page/commenting"));
        assert_eq!(r.state.get_child_ids("c1").len(), 2);
    }

    #[test]
    fn test_range_cannot_leave_its_canvases_behind() {
        let s = state();
        // r1 points at c1, which stays in m1
        assert!(matches!(
            reduce(&s, &actions::move_item("r1", "m2", None)),
            Err(ReduceError::StructuralViolation(_))
        ));
        assert!(reduce(&s, &actions::move_item("r2", "m2", None)).is_ok());

        let stray = Range::new("r7").with_canvas_ref("c1");
        assert!(matches!(
            reduce(&s, &actions::add_item("m2", Resource::Range(stray), None)),
            Err(ReduceError::StructuralViolation(_))
        ));
    }

    #[test]
    fn test_annotation_target_must_match_canvas() {
        let s = state();
        assert!(matches!(
            reduce(&s, &actions::add_annotation("c1", note("n1", "c2"))),
            Err(ReduceError::Validation(_))
        ));
    }

    #[test]
    fn test_move_checks_compatibility() {
        let s = state();
        let err = reduce(&s, &actions::move_item("c1", "g1", None)).unwrap_err();
        assert!(matches!(err, ReduceError::StructuralViolation(_)));

        let ok = reduce(&s, &actions::move_item("c1", "m2", Some(0))).unwrap();
        assert_eq!(ok.state.get_child_ids("m2"), &["c1", "d1"]);
        assert_eq!(ok.changes[0].property, "parent");
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let s = state();
        assert!(matches!(
            reduce(&s, &actions::move_item("r1", "r2", None)),
            Err(ReduceError::StructuralViolation(_))
        ));
    }

    #[test]
    fn test_create_range_requires_canvases_of_same_manifest() {
        let s = state();
        let label = LanguageMap::single("en", "Chapter");
        let ok = reduce(
            &s,
            &actions::create_range("m1", "r9", Some(&label), vec!["c2".to_string(), "c3".to_string()]),
        )
        .unwrap();
        assert_eq!(ok.state.get_entity_type("r9"), Some(EntityKind::Range));

        assert!(matches!(
            reduce(&s, &actions::create_range("m1", "r9", None, vec!["d1".to_string()])),
            Err(ReduceError::StructuralViolation(_))
        ));
        assert!(matches!(
            reduce(&s, &actions::create_range("m1", "r9", None, vec!["zz".to_string()])),
            Err(ReduceError::NotFound(_))
        ));
    }

    #[test]
    fn test_range_items_may_not_drop_sub_ranges() {
        let s = state();
        let items = vec![RangeItemRef::Canvas("c2".to_string())];
        assert!(reduce(&s, &actions::update_range_items("r1", items)).is_err());

        let items = vec![RangeItemRef::Range("r2".to_string()), RangeItemRef::Canvas("c2".to_string())];
        let r = reduce(&s, &actions::update_range_items("r1", items)).unwrap();
        assert_eq!(r.changes[0].property, "items");
    }

    #[test]
    fn test_batch_update_is_atomic() {
        let s = state();
        let changes = PropertyChanges {
            behavior: Some(vec!["paged".to_string()]),
            ..Default::default()
        };
        // paged is not legal on a canvas, so nothing is written
        let err = reduce(&s, &actions::batch_update(vec!["m1".to_string(), "c1".to_string()], changes.clone()))
            .unwrap_err();
        assert!(err.to_string().contains("c1"));

        let r = reduce(&s, &actions::batch_update(vec!["m1".to_string(), "m2".to_string()], changes)).unwrap();
        assert_eq!(r.changes.len(), 2);
    }

    #[test]
    fn test_batch_restore_reports_per_item() {
        let s = state();
        let s = reduce(&s, &actions::move_to_trash("c1")).unwrap().state;
        let r = reduce(&s, &actions::batch_restore(vec!["c1".to_string(), "nope".to_string()])).unwrap();
        assert!(r.state.contains("c1"));
        assert!(!r.is_success());
        assert_eq!(r.item_errors.len(), 1);
        assert_eq!(r.item_errors[0].id, "nope");

        assert!(reduce(&s, &actions::batch_restore(vec!["nope".to_string()])).is_err());
    }

    #[test]
    fn test_restore_checks_compatibility_of_override_parent() {
        let s = state();
        let s = reduce(&s, &actions::move_to_trash("c1")).unwrap().state;
        assert!(matches!(
            reduce(&s, &actions::restore_from_trash("c1", Some("g1".to_string()), None)),
            Err(ReduceError::StructuralViolation(_))
        ));
        let r = reduce(&s, &actions::restore_from_trash("c1", Some("m2".to_string()), Some(1))).unwrap();
        assert_eq!(r.state.get_child_ids("m2"), &["d1", "c1"]);
    }

    #[test]
    fn test_membership_of_owned_manifest_is_rejected() {
        let s = state();
        assert!(reduce(&s, &actions::add_membership("g1", "m1")).is_err());
    }

    #[test]
    fn test_unknown_and_malformed_raw_actions() {
        let s = state();
        assert_eq!(
            reduce_value(&s, &json!({"type": "Explode"})).unwrap_err(),
            ReduceError::UnknownAction("Explode".to_string())
        );
        assert!(matches!(
            reduce_value(&s, &json!({"type": "MoveItem", "payload": {"id": 3}})),
            Err(ReduceError::Validation(_))
        ));
        assert!(reduce_value(&s, &json!({"type": "MoveItem", "payload": {"id": "c1", "newParentId": "m2"}})).is_ok());
    }

    #[test]
    fn test_missing_entity_is_not_found() {
        let s = state();
        assert_eq!(
            reduce(&s, &actions::update_label("ghost", &LanguageMap::single("en", "x"))).unwrap_err(),
            ReduceError::NotFound("ghost".to_string())
        );
    }
}
