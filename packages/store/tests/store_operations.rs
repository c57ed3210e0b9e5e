//! Write primitives against a realistic archive
//!
//! Covers:
//! - Ownership and reference indices after moves, reorders and removals
//! - Trash round-trips back to the exact original document
//! - Immutability of the input state

use folio_model::{
    Annotation, AnnotationPage, Canvas, Collection, CollectionItem, Entity, EntityKind,
    LanguageMap, Manifest, Motivation, Range, RangeItemRef, Resource,
};
use folio_store::{denormalize, normalize, EntityPatch, RestoreOptions, State, StoreError};
use serde_json::json;

fn archive() -> Resource {
    let volume = Manifest::new("m1")
        .with_label("en", "Volume 1")
        .with_canvas(
            Canvas::new("m1/c1", 100, 100).with_page(AnnotationPage::new("m1/c1/p1").with_annotation(
                Annotation::new("m1/c1/a1", Motivation::Painting, "m1/c1", json!({"id": "f1.jpg"})),
            )),
        )
        .with_canvas(Canvas::new("m1/c2", 100, 100))
        .with_canvas(Canvas::new("m1/c3", 100, 100))
        .with_range(
            Range::new("m1/toc")
                .with_canvas_ref("m1/c1")
                .with_range(Range::new("m1/ch1").with_canvas_ref("m1/c2"))
                .with_range(Range::new("m1/ch2").with_canvas_ref("m1/c3")),
        );
    let letters = Collection::new("letters").with_item(CollectionItem::Manifest(Manifest::new("m2")));

    let mut root = Collection::new("root")
        .with_label("en", "Archive")
        .with_item(CollectionItem::Manifest(volume))
        .with_item(CollectionItem::Collection(letters));
    root.members.push("m2".to_string());
    Resource::Collection(root)
}

fn state() -> State {
    normalize(&archive()).unwrap()
}

#[test]
fn test_reads_follow_ownership() {
    let state = state();

    assert_eq!(state.root_id(), Some("root"));
    assert_eq!(state.get_entity_type("m1/ch1"), Some(EntityKind::Range));
    assert_eq!(
        state.get_ancestors("m1/c1/a1"),
        vec!["m1/c1/p1", "m1/c1", "m1", "root"]
    );
    assert_eq!(
        state.get_descendants("m1/toc"),
        vec!["m1/ch1".to_string(), "m1/ch2".to_string()]
    );
    assert_eq!(state.ids_of_kind(EntityKind::Manifest), vec!["m1", "m2"]);
}

#[test]
fn test_failed_write_leaves_input_untouched() {
    let state = state();
    let before = state.clone();

    let err = state.move_entity("m1", "m1/c1", None).unwrap_err();
    assert!(matches!(err, StoreError::CycleDetected { .. }));
    assert_eq!(state, before);
}

#[test]
fn test_move_keeps_indices_consistent() {
    let state = state().move_entity("m1/c3", "m2", Some(0)).unwrap();

    assert_eq!(state.get_parent_id("m1/c3"), Some("m2"));
    assert_eq!(state.get_child_ids("m1"), &["m1/c1".to_string(), "m1/c2".to_string(), "m1/toc".to_string()]);
    // The reference from the chapter is not ownership; it moves with nothing
    assert_eq!(state.referrers("m1/c3"), vec!["m1/ch2".to_string()]);
    state.check_invariants().unwrap();
}

#[test]
fn test_reordering_ranges_rewrites_members() {
    let state = state()
        .reorder_children("m1/toc", vec!["m1/ch2".to_string(), "m1/ch1".to_string()])
        .unwrap();

    match state.get_entity("m1/toc") {
        Some(Entity::Range(range)) => assert_eq!(
            range.items,
            vec![
                RangeItemRef::Canvas("m1/c1".to_string()),
                RangeItemRef::Range("m1/ch2".to_string()),
                RangeItemRef::Range("m1/ch1".to_string()),
            ]
        ),
        other => panic!("expected range, got {:?}", other),
    }
    state.check_invariants().unwrap();
}

#[test]
fn test_remove_severs_references_everywhere() {
    let state = state().move_entity_to_trash("m1/toc").unwrap();
    let state = state.remove_entity("m1/c2").unwrap();
    assert!(state.referrers("m1/c2").is_empty());

    // The trashed chapter no longer points at the removed canvas once restored
    let state = state
        .restore_entity_from_trash("m1/toc", &RestoreOptions::default())
        .unwrap();
    match state.get_entity("m1/ch1") {
        Some(Entity::Range(range)) => assert!(range.items.is_empty()),
        other => panic!("expected range, got {:?}", other),
    }
    state.check_invariants().unwrap();
}

#[test]
fn test_removing_a_listed_manifest_drops_the_membership() {
    let state = state().remove_entity("m2").unwrap();
    assert!(state.memberships("root").is_empty());
    state.check_invariants().unwrap();
}

#[test]
fn test_trash_round_trip_is_exact() {
    let original = state();
    for id in ["m1", "m1/c2", "m1/ch1", "letters"] {
        let trashed = original.move_entity_to_trash(id).unwrap();
        trashed.check_invariants().unwrap();

        let restored = trashed
            .restore_entity_from_trash(id, &RestoreOptions::default())
            .unwrap();
        assert_eq!(denormalize(&restored).unwrap(), archive(), "round trip of {}", id);
    }
}

#[test]
fn test_restore_needs_the_original_parent() {
    let nested = state()
        .move_entity_to_trash("m1/ch1")
        .unwrap()
        .move_entity_to_trash("m1/toc")
        .unwrap();
    let (purged, errors) = nested.empty_trash();
    assert!(errors.is_empty());
    assert!(purged.trash_entries().next().is_none());
    purged.check_invariants().unwrap();

    let state = state()
        .move_entity_to_trash("m1/c1")
        .unwrap()
        .remove_entity("m1")
        .unwrap();
    assert_eq!(
        state.restore_entity_from_trash("m1/c1", &RestoreOptions::default()),
        Err(StoreError::OriginalParentMissing {
            id: "m1/c1".to_string(),
            parent_id: "m1".to_string(),
        })
    );

    let moved = state
        .restore_entity_from_trash(
            "m1/c1",
            &RestoreOptions {
                parent_id: Some("m2".to_string()),
                index: None,
            },
        )
        .unwrap();
    assert_eq!(moved.get_parent_id("m1/c1"), Some("m2"));
}

#[test]
fn test_update_is_shallow() {
    let patch = EntityPatch {
        summary: Some(Some(LanguageMap::single("en", "Bound letters"))),
        ..EntityPatch::default()
    };
    let state = state().update_entity("m1", &patch).unwrap();
    let props = state.get_entity("m1").unwrap().props();

    assert_eq!(props.label, Some(LanguageMap::single("en", "Volume 1")));
    assert_eq!(props.summary, Some(LanguageMap::single("en", "Bound letters")));
}

#[test]
fn test_root_cannot_be_detached() {
    let state = state();
    assert_eq!(
        state.move_entity_to_trash("root"),
        Err(StoreError::CannotDetachRoot("root".to_string()))
    );
    assert_eq!(
        state.remove_entity("root"),
        Err(StoreError::CannotDetachRoot("root".to_string()))
    );
}

#[test]
fn test_range_items_must_reference_live_canvases() {
    let state = state();
    let items = vec![
        RangeItemRef::Canvas("m1/c3".to_string()),
        RangeItemRef::Canvas("m1/c2".to_string()),
    ];
    let next = state.set_range_items("m1/ch1", items).unwrap();
    assert_eq!(next.referrers("m1/c3"), vec!["m1/ch1".to_string(), "m1/ch2".to_string()]);
    next.check_invariants().unwrap();

    let bad = vec![RangeItemRef::Canvas("m2".to_string())];
    assert!(matches!(
        state.set_range_items("m1/ch1", bad),
        Err(StoreError::DanglingReference { .. })
    ));
}

#[test]
fn test_memberships_are_idempotent() {
    let state = state().add_membership("letters", "m1").unwrap();
    let again = state.add_membership("letters", "m1").unwrap();
    assert_eq!(again.memberships("letters"), &["m1".to_string()]);

    let state = again.remove_membership("letters", "m1").unwrap();
    assert!(state.memberships("letters").is_empty());
    assert_eq!(state.referrers("m1"), Vec::<String>::new());
}
