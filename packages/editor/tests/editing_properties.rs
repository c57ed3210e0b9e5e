//! End-to-end behavior of an editing session

use folio_editor::{actions, Action, Dispatcher, ReduceError, Selectors};
use folio_model::{
    Annotation, AnnotationPage, Behavior, Canvas, Collection, CollectionItem, EntityKind, LanguageMap,
    Manifest, Motivation, Range, Resource,
};
use folio_store::{denormalize, normalize};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

const BASE: &str = "https://example.org/iiif";

fn id(path: &str) -> String {
    format!("{}/{}", BASE, path)
}

fn painted(path: &str) -> Canvas {
    let canvas = id(path);
    Canvas::new(&canvas, 1200, 1600)
        .with_label("en", path)
        .with_page(AnnotationPage::new(format!("{}/page/1", canvas)).with_annotation(Annotation::new(
            format!("{}/image", canvas),
            Motivation::Painting,
            &canvas,
            json!({"id": format!("{}.jpg", canvas), "type": "Image", "format": "image/jpeg"}),
        )))
}

/// g1 ─┬─ m1 (c1, c2, c3; r1 → c1, c2)
///     └─ m2 (d1)
fn archive() -> Resource {
    let m1 = Manifest::new(id("m1"))
        .with_label("en", "Letters")
        .with_canvas(painted("c1"))
        .with_canvas(painted("c2"))
        .with_canvas(painted("c3"))
        .with_range(
            Range::new(id("r1"))
                .with_canvas_ref(id("c1"))
                .with_canvas_ref(id("c2")),
        );
    let m2 = Manifest::new(id("m2")).with_label("en", "Diary").with_canvas(painted("d1"));

    Resource::Collection(
        Collection::new(id("g1"))
            .with_label("en", "Archive")
            .with_item(CollectionItem::Manifest(m1))
            .with_item(CollectionItem::Manifest(m2)),
    )
}

fn editor(capacity: usize) -> Dispatcher {
    Dispatcher::from_document(&archive(), capacity).unwrap()
}

#[test]
fn test_round_trip_through_an_editing_session() {
    let document = archive();
    let d = editor(10);
    assert_eq!(denormalize(d.state()).unwrap(), document);
}

#[test]
fn test_rejected_action_keeps_state_identity() {
    let mut d = editor(10);
    let before = Arc::clone(d.state());

    let rejected = [
        actions::move_item(id("c1"), id("g1"), None),
        actions::update_rights(id("m1"), Some("all rights reserved")),
        actions::reorder_canvases(id("m1"), vec![id("c1")]),
        actions::remove_canvas(id("m2"), id("c1")),
        actions::move_to_trash(id("g1")),
    ];
    for action in rejected {
        assert!(!d.dispatch(action));
        assert!(Arc::ptr_eq(&before, d.state()));
    }
    assert_eq!(d.history_len(), 0);
}

#[test]
fn test_undo_redo_symmetry() {
    let mut d = editor(10);
    let before = (**d.state()).clone();

    assert!(d.dispatch(actions::move_item(id("c3"), id("m2"), Some(0))));
    let after = (**d.state()).clone();

    assert!(d.undo());
    assert_eq!(**d.state(), before);
    assert!(d.redo());
    assert_eq!(**d.state(), after);
    assert!(!d.redo());
}

#[test]
fn test_history_keeps_most_recent_entries() {
    let capacity = 3;
    let mut d = editor(capacity);

    for n in 0..=capacity {
        let label = LanguageMap::single("en", format!("Letters v{}", n));
        assert!(d.dispatch(actions::update_label(id("m1"), &label)));
    }

    assert_eq!(d.history_len(), capacity);
    let labels: Vec<String> = d
        .history()
        .entries()
        .map(|entry| match &entry.action {
            Action::UpdateLabel { label, .. } => label["en"][0].as_str().unwrap_or_default().to_string(),
            other => other.type_name().to_string(),
        })
        .collect();
    assert_eq!(labels, vec!["Letters v1", "Letters v2", "Letters v3"]);

    // Undo walks all the way back to the oldest retained step
    for _ in 0..capacity {
        assert!(d.undo());
    }
    assert!(!d.can_undo());
    let label = d.state().get_entity(&id("m1")).unwrap().props().label.clone();
    assert_eq!(label, Some(LanguageMap::single("en", "Letters v0")));
}

#[test]
fn test_invariants_hold_after_a_long_session() {
    let mut d = editor(0);
    let script = vec![
        actions::add_canvas(id("m2"), painted("d2"), None),
        actions::reorder_canvases(id("m1"), vec![id("c2"), id("c3"), id("c1")]),
        actions::move_item(id("c3"), id("m2"), Some(1)),
        actions::create_range(id("m1"), id("r2"), None, vec![id("c1")]),
        actions::move_item(id("r2"), id("r1"), None),
        actions::add_annotation(
            id("c1"),
            Annotation::new(id("c1/note"), Motivation::Commenting, id("c1"), json!({"value": "torn"})),
        ),
        actions::move_to_trash(id("c2")),
        actions::add_item(id("g1"), Resource::Collection(Collection::new(id("g2"))), Some(0)),
        actions::move_item(id("m2"), id("g2"), None),
        actions::add_membership(id("g1"), id("m2")),
        actions::empty_trash(),
        actions::remove_annotation(id("c1"), id("c1/note")),
    ];

    for action in script {
        let name = action.type_name();
        assert!(d.dispatch(action), "{} failed", name);
        d.state().check_invariants().unwrap();
    }

    assert_eq!(d.state().get_child_ids(&id("g1")), &[id("g2"), id("m1")]);
    assert_eq!(d.state().memberships(&id("g1")), &[id("m2")]);
    assert!(!d.state().contains(&id("c2")));
    assert!(d.state().trash_entries().next().is_none());
}

#[test]
fn test_canvas_cannot_move_into_a_collection() {
    let mut d = editor(10);
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    d.subscribe_errors(move |error, _| sink.borrow_mut().push(error.clone()));

    assert!(!d.dispatch(actions::move_item(id("c1"), id("g1"), None)));

    let errors = errors.borrow();
    let ReduceError::StructuralViolation(message) = &errors[0] else {
        panic!("expected a structural violation, got {:?}", errors[0]);
    };
    assert!(message.contains("Canvas"), "{}", message);
    assert!(message.contains("under Collection"), "{}", message);
    assert!(message.contains("Collection, Manifest"), "{}", message);
}

#[test]
fn test_exclusive_behaviors_are_rejected() {
    let mut d = editor(10);
    assert!(!d.dispatch(actions::update_behavior(
        id("m1"),
        &[Behavior::Individuals, Behavior::Continuous]
    )));
    assert!(d.dispatch(actions::update_behavior(id("m1"), &[Behavior::Continuous])));
    assert_eq!(
        d.state().get_entity(&id("m1")).unwrap().props().behavior,
        vec![Behavior::Continuous]
    );
}

#[test]
fn test_trash_round_trip_restores_position() {
    let mut d = editor(10);
    let original = d.state().get_child_ids(&id("m1")).to_vec();

    assert!(d.dispatch(actions::move_to_trash(id("c2"))));
    assert!(!d.state().get_child_ids(&id("m1")).contains(&id("c2")));

    assert!(d.dispatch(actions::restore_from_trash(id("c2"), None, None)));
    assert_eq!(d.state().get_child_ids(&id("m1")), original.as_slice());
    assert_eq!(d.state().get_parent_id(&id("c2")), Some(id("m1").as_str()));
}

#[test]
fn test_batch_restore_commits_and_reports_failures() {
    let mut d = editor(10);
    d.dispatch(actions::move_to_trash(id("c1")));
    d.dispatch(actions::move_to_trash(id("d1")));

    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    d.subscribe_errors(move |error, _| sink.borrow_mut().push(error.clone()));

    let ids = vec![id("c1"), id("missing"), id("d1")];
    let before = Arc::clone(d.state());
    assert!(!d.dispatch(actions::batch_restore(ids)));
    assert!(!Arc::ptr_eq(&before, d.state()));
    assert!(d.state().contains(&id("c1")));
    assert!(d.state().contains(&id("d1")));
    assert_eq!(errors.borrow().len(), 1);
    assert!(matches!(errors.borrow()[0], ReduceError::NotFound(_)));
}

#[test]
fn test_selectors_follow_dispatches() {
    let mut d = editor(10);
    let selectors = Selectors::new("en");

    let before = selectors.subtree(d.state(), &id("m2"));
    assert_eq!(before.len(), 4);

    d.dispatch(actions::move_item(id("c1"), id("m2"), None));
    let after = selectors.subtree(d.state(), &id("m2"));
    assert_eq!(after.len(), 7);
    assert_eq!(after[4].kind, EntityKind::Canvas);
    assert_eq!(after[4].label.as_deref(), Some("c1"));

    let crumbs: Vec<String> = selectors
        .breadcrumbs(d.state(), &id("c1"))
        .iter()
        .filter_map(|c| c.label.clone())
        .collect();
    assert_eq!(crumbs, vec!["Archive", "Diary", "c1"]);
    assert!(selectors.validation_summary(d.state()).is_clean());
}

#[test]
fn test_normalized_state_matches_dispatcher_seed() {
    let state = normalize(&archive()).unwrap();
    let d = editor(1);
    assert_eq!(**d.state(), state);
}
