//! # Normalize / Denormalize
//!
//! Converts between the nested [`Resource`] document and the flat [`State`].
//!
//! `denormalize(normalize(doc)) == doc` for any document whose ids are
//! unique and whose references all resolve. Canvas pages come back split by
//! their declared purpose, so a page's placement survives the trip.

use crate::error::{StoreError, StoreResult};
use crate::state::State;
use folio_model::{
    Annotation, AnnotationPage, Canvas, CanvasRef, Collection, CollectionItem, Entity, EntityKind,
    Manifest, NodeRef, PagePurpose, Range, RangeItem, RangeItemRef, Resource,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

/// Build a fresh state from a nested document
#[instrument(skip_all, fields(root = %resource.id()))]
pub fn normalize(resource: &Resource) -> StoreResult<State> {
    let state = State::new().insert_subtree(None, None, resource)?;
    info!(entities = state.len(), "Normalized document");
    Ok(state)
}

/// Rebuild the nested document from the root down
#[instrument(skip_all)]
pub fn denormalize(state: &State) -> StoreResult<Resource> {
    let root = state.root_id().ok_or(StoreError::EmptyStore)?;
    denormalize_subtree(state, root)
}

/// Rebuild the nested document rooted at any live entity
pub fn denormalize_subtree(state: &State, id: &str) -> StoreResult<Resource> {
    Ok(match state.require(id)? {
        Entity::Collection(_) => Resource::Collection(build_collection(state, id)?),
        Entity::Manifest(_) => Resource::Manifest(build_manifest(state, id)?),
        Entity::Canvas(_) => Resource::Canvas(build_canvas(state, id)?),
        Entity::Range(_) => Resource::Range(build_range(state, id)?),
        Entity::AnnotationPage(_) => Resource::AnnotationPage(build_page(state, id, false)?),
        Entity::Annotation(_) => Resource::Annotation(build_annotation(state, id)?),
    })
}

impl State {
    /// Graft a nested document under `parent_id` at `index`, or make it the
    /// root when `parent_id` is `None`.
    ///
    /// All ids in the document must be unused and every canvas reference and
    /// collection member must resolve once the document is in place.
    pub fn insert_subtree(
        &self,
        parent_id: Option<&str>,
        index: Option<usize>,
        resource: &Resource,
    ) -> StoreResult<State> {
        match parent_id {
            Some(parent) if !self.contains(parent) => {
                return Err(StoreError::ParentNotFound(parent.to_string()))
            }
            None => {
                if let Some(root) = &self.root {
                    return Err(StoreError::RootExists(root.clone()));
                }
            }
            _ => {}
        }

        let visits = resource.as_node().walk();
        let mut seen = HashSet::new();
        for visit in &visits {
            let id = visit.node.id();
            if self.id_in_use(id) || !seen.insert(id) {
                return Err(StoreError::DuplicateId(id.to_string()));
            }
        }

        let mut next = self.clone();
        for visit in &visits {
            let id = visit.node.id();
            let has_list = !matches!(visit.node, NodeRef::Collection(c) if c.items.is_none());
            next.insert_record(Entity::from_node(visit.node, visit.parent), has_list);

            match (visit.parent, parent_id) {
                (Some(owner), _) => {
                    next.link_child(owner.id(), id, None);
                }
                (None, Some(graft)) => {
                    next.link_child(graft, id, index);
                    next.link_range_member(graft, id, None);
                }
                (None, None) => next.root = Some(id.to_string()),
            }
        }

        for visit in &visits {
            match visit.node {
                NodeRef::Collection(collection) if !collection.members.is_empty() => {
                    let mut listed = Vec::new();
                    for member in &collection.members {
                        if next.get_entity_type(member) != Some(EntityKind::Manifest) {
                            return Err(StoreError::DanglingReference {
                                from: collection.id.clone(),
                                to: member.clone(),
                                kind: EntityKind::Manifest,
                            });
                        }
                        if !listed.contains(member) {
                            listed.push(member.clone());
                        }
                    }
                    for member in &listed {
                        next.index_reference(&collection.id, member);
                    }
                    Arc::make_mut(&mut next.memberships).insert(collection.id.clone(), listed);
                }
                NodeRef::Range(range) => {
                    for item in &range.items {
                        let RangeItem::Canvas(canvas) = item else {
                            continue;
                        };
                        if next.get_entity_type(&canvas.id) != Some(EntityKind::Canvas) {
                            return Err(StoreError::DanglingReference {
                                from: range.id.clone(),
                                to: canvas.id.clone(),
                                kind: EntityKind::Canvas,
                            });
                        }
                        next.index_reference(&range.id, &canvas.id);
                    }
                }
                _ => {}
            }
        }

        Ok(next)
    }
}

fn children_of_kind(state: &State, id: &str, kind: EntityKind) -> Vec<String> {
    state
        .get_child_ids(id)
        .iter()
        .filter(|child| state.get_entity_type(child) == Some(kind))
        .cloned()
        .collect()
}

fn build_collection(state: &State, id: &str) -> StoreResult<Collection> {
    let Entity::Collection(entity) = state.require(id)? else {
        return Err(StoreError::NotFound(id.to_string()));
    };

    let items = if state.has_child_list(id) {
        let mut items = Vec::new();
        for child in state.get_child_ids(id) {
            match state.require_kind(child)? {
                EntityKind::Collection => {
                    items.push(CollectionItem::Collection(build_collection(state, child)?))
                }
                EntityKind::Manifest => items.push(CollectionItem::Manifest(build_manifest(state, child)?)),
                other => {
                    return Err(StoreError::InvariantViolation(format!(
                        "collection {} owns a {}",
                        id, other
                    )))
                }
            }
        }
        Some(items)
    } else {
        None
    };

    let members = state
        .memberships(id)
        .iter()
        .filter(|m| state.get_entity_type(m) == Some(EntityKind::Manifest))
        .cloned()
        .collect();

    Ok(Collection {
        id: entity.id.clone(),
        props: entity.props.clone(),
        items,
        members,
    })
}

fn build_manifest(state: &State, id: &str) -> StoreResult<Manifest> {
    let Entity::Manifest(entity) = state.require(id)? else {
        return Err(StoreError::NotFound(id.to_string()));
    };

    let items = children_of_kind(state, id, EntityKind::Canvas)
        .iter()
        .map(|canvas| build_canvas(state, canvas))
        .collect::<StoreResult<Vec<_>>>()?;
    let structures = children_of_kind(state, id, EntityKind::Range)
        .iter()
        .map(|range| build_range(state, range))
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(Manifest {
        id: entity.id.clone(),
        props: entity.props.clone(),
        items,
        structures,
    })
}

fn build_canvas(state: &State, id: &str) -> StoreResult<Canvas> {
    let Entity::Canvas(entity) = state.require(id)? else {
        return Err(StoreError::NotFound(id.to_string()));
    };

    let mut items = Vec::new();
    let mut annotations = Vec::new();
    for page_id in state.get_child_ids(id) {
        let page = build_page(state, page_id, true)?;
        match state.get_entity(page_id) {
            Some(Entity::AnnotationPage(p)) if p.purpose.is_primary() => items.push(page),
            _ => annotations.push(page),
        }
    }

    Ok(Canvas {
        id: entity.id.clone(),
        props: entity.props.clone(),
        dimensions: entity.dimensions,
        items,
        annotations,
    })
}

fn build_range(state: &State, id: &str) -> StoreResult<Range> {
    let Entity::Range(entity) = state.require(id)? else {
        return Err(StoreError::NotFound(id.to_string()));
    };

    let mut items = Vec::new();
    for item in &entity.items {
        match item {
            RangeItemRef::Canvas(canvas) => {
                if state.get_entity_type(canvas) == Some(EntityKind::Canvas) {
                    items.push(RangeItem::Canvas(CanvasRef { id: canvas.clone() }));
                }
            }
            RangeItemRef::Range(nested) => items.push(RangeItem::Range(build_range(state, nested)?)),
        }
    }

    Ok(Range {
        id: entity.id.clone(),
        props: entity.props.clone(),
        items,
    })
}

/// `placed` pages sit in a canvas list, which already says whether they paint.
/// The purpose is written out whenever reading the page back would not infer
/// it again.
fn build_page(state: &State, id: &str, placed: bool) -> StoreResult<AnnotationPage> {
    let Entity::AnnotationPage(entity) = state.require(id)? else {
        return Err(StoreError::NotFound(id.to_string()));
    };

    let items = state
        .get_child_ids(id)
        .iter()
        .map(|annotation| build_annotation(state, annotation))
        .collect::<StoreResult<Vec<_>>>()?;

    let mut page = AnnotationPage {
        id: entity.id.clone(),
        props: entity.props.clone(),
        purpose: None,
        items,
    };
    let inferred = PagePurpose::inferred(&page, placed && entity.purpose.is_primary());
    if entity.declared || inferred != entity.purpose {
        page.purpose = Some(entity.purpose);
    }
    Ok(page)
}

fn build_annotation(state: &State, id: &str) -> StoreResult<Annotation> {
    let Entity::Annotation(entity) = state.require(id)? else {
        return Err(StoreError::NotFound(id.to_string()));
    };

    Ok(Annotation {
        id: entity.id.clone(),
        props: entity.props.clone(),
        motivation: entity.motivation,
        body: entity.body.clone(),
        target: entity.target.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::{Motivation, PagePurpose};
    use serde_json::json;

    fn book() -> Manifest {
        Manifest::new("m1")
            .with_label("en", "Book")
            .with_canvas(
                Canvas::new("c1", 100, 200)
                    .with_page(AnnotationPage::new("c1/p1").with_annotation(Annotation::new(
                        "c1/a1",
                        Motivation::Painting,
                        "c1",
                        json!({"id": "img.jpg"}),
                    )))
                    .with_annotation_page(AnnotationPage::new("c1/p2")),
            )
            .with_canvas(Canvas::new("c2", 100, 200))
            .with_range(
                Range::new("toc")
                    .with_canvas_ref("c1")
                    .with_range(Range::new("ch1").with_canvas_ref("c2")),
            )
    }

    #[test]
    fn test_round_trip_is_exact() {
        let doc = Resource::Collection(Collection::new("root").with_item(CollectionItem::Manifest(book())));
        let state = normalize(&doc).unwrap();
        state.check_invariants().unwrap();
        assert_eq!(denormalize(&state).unwrap(), doc);
    }

    #[test]
    fn test_pages_keep_their_placement() {
        let state = normalize(&Resource::Manifest(book())).unwrap();
        assert!(matches!(
            state.get_entity("c1/p1"),
            Some(Entity::AnnotationPage(p)) if p.purpose == PagePurpose::Painting
        ));
        assert!(matches!(
            state.get_entity("c1/p2"),
            Some(Entity::AnnotationPage(p)) if p.purpose == PagePurpose::Mixed
        ));
    }

    #[test]
    fn test_page_purpose_survives_emptying() {
        let canvas = Canvas::new("c1", 100, 200).with_annotation_page(
            AnnotationPage::new("c1/notes").with_annotation(Annotation::new(
                "c1/n1",
                Motivation::Commenting,
                "c1",
                json!("torn"),
            )),
        );
        let doc = Resource::Manifest(Manifest::new("m1").with_canvas(canvas));
        let state = normalize(&doc).unwrap();
        assert_eq!(denormalize(&state).unwrap(), doc);

        let emptied = state.remove_entity("c1/n1").unwrap();
        let reloaded = normalize(&denormalize(&emptied).unwrap()).unwrap();
        assert!(matches!(
            reloaded.get_entity("c1/notes"),
            Some(Entity::AnnotationPage(p)) if p.purpose == PagePurpose::Motivated(Motivation::Commenting)
        ));
    }

    #[test]
    fn test_declared_purpose_round_trips() {
        let declared = PagePurpose::Motivated(Motivation::Tagging);
        let canvas = Canvas::new("c1", 100, 200)
            .with_annotation_page(AnnotationPage::new("c1/tags").with_purpose(declared));
        let doc = Resource::Manifest(Manifest::new("m1").with_canvas(canvas));
        assert_eq!(denormalize(&normalize(&doc).unwrap()).unwrap(), doc);
    }

    #[test]
    fn test_missing_child_list_is_preserved() {
        let mut collection = Collection::new("root");
        collection.items = None;
        let doc = Resource::Collection(collection);

        let state = normalize(&doc).unwrap();
        assert!(!state.has_child_list("root"));
        assert_eq!(denormalize(&state).unwrap(), doc);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let manifest = Manifest::new("m1")
            .with_canvas(Canvas::new("c1", 1, 1))
            .with_canvas(Canvas::new("c1", 1, 1));
        assert_eq!(
            normalize(&Resource::Manifest(manifest)),
            Err(StoreError::DuplicateId("c1".to_string()))
        );
    }

    #[test]
    fn test_dangling_canvas_reference_is_rejected() {
        let manifest = Manifest::new("m1").with_range(Range::new("r1").with_canvas_ref("nowhere"));
        assert!(matches!(
            normalize(&Resource::Manifest(manifest)),
            Err(StoreError::DanglingReference { kind: EntityKind::Canvas, .. })
        ));
    }

    #[test]
    fn test_collection_members_are_references() {
        let mut collection = Collection::new("root")
            .with_item(CollectionItem::Manifest(Manifest::new("m1")))
            .with_item(CollectionItem::Collection(Collection::new("sub")));
        if let Some(CollectionItem::Collection(sub)) = collection.items.as_mut().and_then(|i| i.get_mut(1)) {
            sub.members.push("m1".to_string());
        }

        let state = normalize(&Resource::Collection(collection)).unwrap();
        assert_eq!(state.memberships("sub"), &["m1".to_string()]);
        assert_eq!(state.get_parent_id("m1"), Some("root"));
        assert_eq!(state.referrers("m1"), vec!["sub".to_string()]);
    }

    #[test]
    fn test_graft_under_a_range_updates_its_members() {
        let state = normalize(&Resource::Manifest(book())).unwrap();
        let state = state
            .insert_subtree(Some("toc"), Some(0), &Resource::Range(Range::new("preface")))
            .unwrap();

        assert_eq!(state.get_child_ids("toc"), &["preface".to_string(), "ch1".to_string()]);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_empty_store_cannot_be_denormalized() {
        assert_eq!(denormalize(&State::new()), Err(StoreError::EmptyStore));
    }
}
