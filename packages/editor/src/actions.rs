//! # Actions
//!
//! Semantic edits, serialized as `{"type": "...", "payload": {...}}`.
//!
//! Localized strings and metadata travel as raw JSON so that hand-built or
//! remote payloads go through the same format checks as typed ones. Prefer
//! the factory functions at the bottom of this module over building variants
//! by hand.

use folio_model::{
    Annotation, Behavior, Canvas, LanguageMap, MetadataEntry, RangeItemRef, Resource,
    ViewingDirection,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum Action {
    // Scalar properties
    UpdateLabel {
        id: String,
        label: Value,
    },
    UpdateSummary {
        id: String,
        summary: Value,
    },
    UpdateMetadata {
        id: String,
        metadata: Value,
    },
    UpdateRights {
        id: String,
        rights: Option<String>,
    },
    UpdateNavDate {
        id: String,
        nav_date: Option<String>,
    },
    UpdateBehavior {
        id: String,
        behavior: Vec<String>,
    },
    UpdateViewingDirection {
        id: String,
        viewing_direction: Option<String>,
    },
    UpdateCanvasDimensions {
        id: String,
        width: u32,
        height: u32,
        #[serde(default)]
        duration: Option<f64>,
    },
    BatchUpdate {
        ids: Vec<String>,
        changes: PropertyChanges,
    },

    // Structure
    AddCanvas {
        manifest_id: String,
        canvas: Canvas,
        #[serde(default)]
        index: Option<usize>,
    },
    RemoveCanvas {
        manifest_id: String,
        canvas_id: String,
    },
    ReorderCanvases {
        manifest_id: String,
        order: Vec<String>,
    },
    AddAnnotation {
        canvas_id: String,
        annotation: Annotation,
    },
    RemoveAnnotation {
        canvas_id: String,
        annotation_id: String,
    },
    AddItem {
        parent_id: String,
        item: Resource,
        #[serde(default)]
        index: Option<usize>,
    },
    MoveItem {
        id: String,
        new_parent_id: String,
        #[serde(default)]
        index: Option<usize>,
    },
    ReorderChildren {
        parent_id: String,
        order: Vec<String>,
    },
    CreateRange {
        parent_id: String,
        id: String,
        #[serde(default)]
        label: Option<Value>,
        #[serde(default)]
        canvas_ids: Vec<String>,
        #[serde(default)]
        index: Option<usize>,
    },
    UpdateRangeItems {
        range_id: String,
        items: Vec<RangeItemRef>,
    },
    AddMembership {
        collection_id: String,
        manifest_id: String,
    },
    RemoveMembership {
        collection_id: String,
        manifest_id: String,
    },

    // Lifecycle
    MoveToTrash {
        id: String,
    },
    RestoreFromTrash {
        id: String,
        #[serde(default)]
        parent_id: Option<String>,
        #[serde(default)]
        index: Option<usize>,
    },
    EmptyTrash,
    BatchRestore {
        ids: Vec<String>,
    },
}

/// Property changes applied to every id of a [`Action::BatchUpdate`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewing_direction: Option<String>,
}

impl Action {
    /// Every wire tag the reducer understands
    pub const TYPES: [&'static str; 25] = [
        "UpdateLabel",
        "UpdateSummary",
        "UpdateMetadata",
        "UpdateRights",
        "UpdateNavDate",
        "UpdateBehavior",
        "UpdateViewingDirection",
        "UpdateCanvasDimensions",
        "BatchUpdate",
        "AddCanvas",
        "RemoveCanvas",
        "ReorderCanvases",
        "AddAnnotation",
        "RemoveAnnotation",
        "AddItem",
        "MoveItem",
        "ReorderChildren",
        "CreateRange",
        "UpdateRangeItems",
        "AddMembership",
        "RemoveMembership",
        "MoveToTrash",
        "RestoreFromTrash",
        "EmptyTrash",
        "BatchRestore",
    ];

    /// Wire tag of this action
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::UpdateLabel { .. } => "UpdateLabel",
            Action::UpdateSummary { .. } => "UpdateSummary",
            Action::UpdateMetadata { .. } => "UpdateMetadata",
            Action::UpdateRights { .. } => "UpdateRights",
            Action::UpdateNavDate { .. } => "UpdateNavDate",
            Action::UpdateBehavior { .. } => "UpdateBehavior",
            Action::UpdateViewingDirection { .. } => "UpdateViewingDirection",
            Action::UpdateCanvasDimensions { .. } => "UpdateCanvasDimensions",
            Action::BatchUpdate { .. } => "BatchUpdate",
            Action::AddCanvas { .. } => "AddCanvas",
            Action::RemoveCanvas { .. } => "RemoveCanvas",
            Action::ReorderCanvases { .. } => "ReorderCanvases",
            Action::AddAnnotation { .. } => "AddAnnotation",
            Action::RemoveAnnotation { .. } => "RemoveAnnotation",
            Action::AddItem { .. } => "AddItem",
            Action::MoveItem { .. } => "MoveItem",
            Action::ReorderChildren { .. } => "ReorderChildren",
            Action::CreateRange { .. } => "CreateRange",
            Action::UpdateRangeItems { .. } => "UpdateRangeItems",
            Action::AddMembership { .. } => "AddMembership",
            Action::RemoveMembership { .. } => "RemoveMembership",
            Action::MoveToTrash { .. } => "MoveToTrash",
            Action::RestoreFromTrash { .. } => "RestoreFromTrash",
            Action::EmptyTrash => "EmptyTrash",
            Action::BatchRestore { .. } => "BatchRestore",
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn update_label(id: impl Into<String>, label: &LanguageMap) -> Action {
    Action::UpdateLabel {
        id: id.into(),
        label: to_value(label),
    }
}

/// `None` clears the summary
pub fn update_summary(id: impl Into<String>, summary: Option<&LanguageMap>) -> Action {
    Action::UpdateSummary {
        id: id.into(),
        summary: summary.map(to_value).unwrap_or(Value::Null),
    }
}

pub fn update_metadata(id: impl Into<String>, metadata: &[MetadataEntry]) -> Action {
    Action::UpdateMetadata {
        id: id.into(),
        metadata: to_value(&metadata),
    }
}

pub fn update_rights(id: impl Into<String>, rights: Option<&str>) -> Action {
    Action::UpdateRights {
        id: id.into(),
        rights: rights.map(str::to_string),
    }
}

pub fn update_nav_date(id: impl Into<String>, nav_date: Option<&str>) -> Action {
    Action::UpdateNavDate {
        id: id.into(),
        nav_date: nav_date.map(str::to_string),
    }
}

pub fn update_behavior(id: impl Into<String>, behavior: &[Behavior]) -> Action {
    Action::UpdateBehavior {
        id: id.into(),
        behavior: behavior.iter().map(|b| b.as_str().to_string()).collect(),
    }
}

pub fn update_viewing_direction(id: impl Into<String>, direction: Option<ViewingDirection>) -> Action {
    Action::UpdateViewingDirection {
        id: id.into(),
        viewing_direction: direction.map(|d| d.as_str().to_string()),
    }
}

pub fn update_canvas_dimensions(id: impl Into<String>, width: u32, height: u32, duration: Option<f64>) -> Action {
    Action::UpdateCanvasDimensions {
        id: id.into(),
        width,
        height,
        duration,
    }
}

pub fn batch_update(ids: Vec<String>, changes: PropertyChanges) -> Action {
    Action::BatchUpdate { ids, changes }
}

pub fn add_canvas(manifest_id: impl Into<String>, canvas: Canvas, index: Option<usize>) -> Action {
    Action::AddCanvas {
        manifest_id: manifest_id.into(),
        canvas,
        index,
    }
}

pub fn remove_canvas(manifest_id: impl Into<String>, canvas_id: impl Into<String>) -> Action {
    Action::RemoveCanvas {
        manifest_id: manifest_id.into(),
        canvas_id: canvas_id.into(),
    }
}

pub fn reorder_canvases(manifest_id: impl Into<String>, order: Vec<String>) -> Action {
    Action::ReorderCanvases {
        manifest_id: manifest_id.into(),
        order,
    }
}

pub fn add_annotation(canvas_id: impl Into<String>, annotation: Annotation) -> Action {
    Action::AddAnnotation {
        canvas_id: canvas_id.into(),
        annotation,
    }
}

pub fn remove_annotation(canvas_id: impl Into<String>, annotation_id: impl Into<String>) -> Action {
    Action::RemoveAnnotation {
        canvas_id: canvas_id.into(),
        annotation_id: annotation_id.into(),
    }
}

pub fn add_item(parent_id: impl Into<String>, item: Resource, index: Option<usize>) -> Action {
    Action::AddItem {
        parent_id: parent_id.into(),
        item,
        index,
    }
}

pub fn move_item(id: impl Into<String>, new_parent_id: impl Into<String>, index: Option<usize>) -> Action {
    Action::MoveItem {
        id: id.into(),
        new_parent_id: new_parent_id.into(),
        index,
    }
}

pub fn reorder_children(parent_id: impl Into<String>, order: Vec<String>) -> Action {
    Action::ReorderChildren {
        parent_id: parent_id.into(),
        order,
    }
}

pub fn create_range(
    parent_id: impl Into<String>,
    id: impl Into<String>,
    label: Option<&LanguageMap>,
    canvas_ids: Vec<String>,
) -> Action {
    Action::CreateRange {
        parent_id: parent_id.into(),
        id: id.into(),
        label: label.map(to_value),
        canvas_ids,
        index: None,
    }
}

pub fn update_range_items(range_id: impl Into<String>, items: Vec<RangeItemRef>) -> Action {
    Action::UpdateRangeItems {
        range_id: range_id.into(),
        items,
    }
}

pub fn add_membership(collection_id: impl Into<String>, manifest_id: impl Into<String>) -> Action {
    Action::AddMembership {
        collection_id: collection_id.into(),
        manifest_id: manifest_id.into(),
    }
}

pub fn remove_membership(collection_id: impl Into<String>, manifest_id: impl Into<String>) -> Action {
    Action::RemoveMembership {
        collection_id: collection_id.into(),
        manifest_id: manifest_id.into(),
    }
}

pub fn move_to_trash(id: impl Into<String>) -> Action {
    Action::MoveToTrash { id: id.into() }
}

/// Restore to the original place unless `parent_id` says otherwise
pub fn restore_from_trash(id: impl Into<String>, parent_id: Option<String>, index: Option<usize>) -> Action {
    Action::RestoreFromTrash {
        id: id.into(),
        parent_id,
        index,
    }
}

pub fn empty_trash() -> Action {
    Action::EmptyTrash
}

pub fn batch_restore(ids: Vec<String>) -> Action {
    Action::BatchRestore { ids }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let action = move_item("c1", "m2", Some(0));
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "MoveItem", "payload": {"id": "c1", "newParentId": "m2", "index": 0}})
        );

        let parsed: Action = serde_json::from_value(json!({"type": "EmptyTrash"})).unwrap();
        assert_eq!(parsed, Action::EmptyTrash);
    }

    #[test]
    fn test_type_names_match_the_wire_tags() {
        let samples = vec![
            update_label("x", &LanguageMap::single("en", "X")),
            update_behavior("x", &[Behavior::Paged]),
            move_to_trash("x"),
            restore_from_trash("x", None, None),
            batch_restore(vec!["x".to_string()]),
            empty_trash(),
            add_membership("c", "m"),
        ];
        for action in samples {
            let wire = serde_json::to_value(&action).unwrap();
            assert_eq!(wire["type"], action.type_name());
            assert!(Action::TYPES.contains(&action.type_name()));
        }
    }
}
