//! Wire-shape tests for the nested document

use folio_model::{
    Behavior, CollectionItem, EntityKind, Motivation, RangeItem, Resource,
};
use serde_json::json;

fn sample() -> serde_json::Value {
    json!({
        "type": "Collection",
        "id": "https://example.org/c/root",
        "label": { "en": ["Letters"], "fr": ["Lettres"] },
        "behavior": ["multi-part"],
        "items": [
            {
                "type": "Manifest",
                "id": "https://example.org/m/1",
                "label": { "none": ["Letter 1"] },
                "items": [
                    {
                        "type": "Canvas",
                        "id": "https://example.org/m/1/c/1",
                        "width": 1200,
                        "height": 1800,
                        "items": [
                            {
                                "type": "AnnotationPage",
                                "id": "https://example.org/m/1/c/1/p/1",
                                "items": [
                                    {
                                        "type": "Annotation",
                                        "id": "https://example.org/m/1/c/1/a/1",
                                        "motivation": "painting",
                                        "body": { "id": "https://example.org/img/1.jpg", "type": "Image" },
                                        "target": "https://example.org/m/1/c/1"
                                    }
                                ]
                            }
                        ]
                    }
                ],
                "structures": [
                    {
                        "type": "Range",
                        "id": "https://example.org/m/1/r/1",
                        "items": [
                            { "type": "Canvas", "id": "https://example.org/m/1/c/1" },
                            { "type": "Range", "id": "https://example.org/m/1/r/2" }
                        ]
                    }
                ]
            }
        ]
    })
}

#[test]
fn test_parse_nested_document() {
    let resource: Resource = serde_json::from_value(sample()).unwrap();
    let Resource::Collection(collection) = &resource else {
        panic!("expected collection root");
    };

    assert_eq!(collection.props.behavior, vec![Behavior::MultiPart]);
    let items = collection.items.as_ref().unwrap();
    let CollectionItem::Manifest(manifest) = &items[0] else {
        panic!("expected manifest");
    };

    assert_eq!(manifest.items[0].dimensions.width, Some(1200));
    assert_eq!(
        manifest.items[0].items[0].items[0].motivation,
        Motivation::Painting
    );
    assert!(matches!(manifest.structures[0].items[0], RangeItem::Canvas(_)));
    assert!(matches!(manifest.structures[0].items[1], RangeItem::Range(_)));
}

#[test]
fn test_serialize_preserves_shape() {
    let resource: Resource = serde_json::from_value(sample()).unwrap();
    let json = serde_json::to_value(&resource).unwrap();
    let reparsed: Resource = serde_json::from_value(json).unwrap();
    assert_eq!(resource, reparsed);
}

#[test]
fn test_missing_collection_items_stays_missing() {
    let resource: Resource = serde_json::from_value(json!({
        "type": "Collection",
        "id": "https://example.org/c/empty"
    }))
    .unwrap();

    let Resource::Collection(collection) = &resource else {
        panic!("expected collection");
    };
    assert!(collection.items.is_none());
    assert!(serde_json::to_value(&resource).unwrap().get("items").is_none());
}

#[test]
fn test_walk_visits_in_document_order() {
    let resource: Resource = serde_json::from_value(sample()).unwrap();
    let visits = resource.as_node().walk();

    let kinds: Vec<(EntityKind, usize)> = visits
        .iter()
        .map(|v| (v.node.kind(), v.depth))
        .collect();

    assert_eq!(
        kinds,
        vec![
            (EntityKind::Collection, 0),
            (EntityKind::Manifest, 1),
            (EntityKind::Canvas, 2),
            (EntityKind::AnnotationPage, 3),
            (EntityKind::Annotation, 4),
            (EntityKind::Range, 2),
            (EntityKind::Range, 3),
        ]
    );
    assert_eq!(visits[2].parent.map(|p| p.id()), Some("https://example.org/m/1"));
}

#[test]
fn test_walk_mut_can_rewrite_ids() {
    let mut resource: Resource = serde_json::from_value(sample()).unwrap();
    resource.as_node_mut().walk(|node| {
        if node.kind() == EntityKind::Canvas {
            node.id_mut().push_str("#renamed");
        }
    });

    let ids: Vec<&str> = resource.as_node().walk().iter().map(|v| v.node.id()).collect();
    assert!(ids.contains(&"https://example.org/m/1/c/1#renamed"));
}
