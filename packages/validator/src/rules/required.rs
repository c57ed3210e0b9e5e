use crate::issue::{Category, Issue, IssueCode};
use crate::rules::Rule;
use folio_model::{Entity, EntityKind};

/// Collections and manifests need a label; canvases should have one
pub struct RequiredLabelRule;

impl Rule for RequiredLabelRule {
    fn name(&self) -> &'static str {
        "required-label"
    }

    fn description(&self) -> &'static str {
        "Collections and manifests must have a label, canvases should"
    }

    fn check_entity(&self, entity: &Entity) -> Vec<Issue> {
        let has_label = entity
            .props()
            .label
            .as_ref()
            .is_some_and(|label| !label.is_blank());
        if has_label {
            return Vec::new();
        }

        let message = format!("{} '{}' has no label", entity.kind(), entity.id());
        match entity.kind() {
            EntityKind::Collection | EntityKind::Manifest => vec![Issue::error(
                entity.id(),
                entity.kind(),
                IssueCode::MissingLabel,
                Category::Metadata,
                message,
            )],
            EntityKind::Canvas => vec![Issue::warning(
                entity.id(),
                entity.kind(),
                IssueCode::MissingLabel,
                Category::Metadata,
                message,
            )],
            _ => Vec::new(),
        }
    }
}

/// Canvases need positive width and height; a duration, if any, must be positive
pub struct DimensionsRule;

impl Rule for DimensionsRule {
    fn name(&self) -> &'static str {
        "dimensions"
    }

    fn description(&self) -> &'static str {
        "Canvas width and height must be present and positive"
    }

    fn check_entity(&self, entity: &Entity) -> Vec<Issue> {
        let Entity::Canvas(canvas) = entity else {
            return Vec::new();
        };
        let mut issues = Vec::new();
        let dims = canvas.dimensions;

        for (name, value) in [("width", dims.width), ("height", dims.height)] {
            match value {
                None => issues.push(Issue::error(
                    &canvas.id,
                    EntityKind::Canvas,
                    IssueCode::MissingDimension,
                    Category::Content,
                    format!("Canvas '{}' has no {}", canvas.id, name),
                )),
                Some(0) => issues.push(Issue::error(
                    &canvas.id,
                    EntityKind::Canvas,
                    IssueCode::InvalidDimension,
                    Category::Content,
                    format!("Canvas '{}' has a {} of 0", canvas.id, name),
                )),
                Some(_) => {}
            }
        }

        if let Some(duration) = dims.duration {
            if !duration.is_finite() || duration <= 0.0 {
                issues.push(Issue::error(
                    &canvas.id,
                    EntityKind::Canvas,
                    IssueCode::InvalidDimension,
                    Category::Content,
                    format!("Canvas '{}' has an invalid duration {}", canvas.id, duration),
                ));
            }
        }

        issues
    }
}

/// Annotations must point at something
pub struct AnnotationTargetRule;

impl Rule for AnnotationTargetRule {
    fn name(&self) -> &'static str {
        "annotation-target"
    }

    fn description(&self) -> &'static str {
        "Annotations must have a target"
    }

    fn check_entity(&self, entity: &Entity) -> Vec<Issue> {
        match entity {
            Entity::Annotation(annotation) if annotation.target.trim().is_empty() => vec![Issue::error(
                &annotation.id,
                EntityKind::Annotation,
                IssueCode::MissingTarget,
                Category::Structure,
                format!("Annotation '{}' has no target", annotation.id),
            )],
            _ => Vec::new(),
        }
    }
}
