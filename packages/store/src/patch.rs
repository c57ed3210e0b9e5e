use crate::error::{StoreError, StoreResult};
use folio_model::{
    Behavior, Dimensions, Entity, LanguageMap, MetadataEntry, Motivation, ViewingDirection,
};

/// Shallow property merge for one entity.
///
/// `None` leaves a field alone. For optional fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPatch {
    pub label: Option<Option<LanguageMap>>,
    pub summary: Option<Option<LanguageMap>>,
    pub metadata: Option<Vec<MetadataEntry>>,
    pub rights: Option<Option<String>>,
    pub nav_date: Option<Option<String>>,
    pub behavior: Option<Vec<Behavior>>,
    pub viewing_direction: Option<Option<ViewingDirection>>,
    pub dimensions: Option<Dimensions>,
    pub motivation: Option<Motivation>,
    pub body: Option<serde_json::Value>,
    pub target: Option<String>,
}

impl EntityPatch {
    pub fn is_empty(&self) -> bool {
        *self == EntityPatch::default()
    }

    /// Apply to a copy of `entity`; kind-specific fields must match the kind
    pub fn apply(&self, entity: &Entity) -> StoreResult<Entity> {
        let mut next = entity.clone();

        let props = next.props_mut();
        if let Some(label) = &self.label {
            props.label = label.clone();
        }
        if let Some(summary) = &self.summary {
            props.summary = summary.clone();
        }
        if let Some(metadata) = &self.metadata {
            props.metadata = metadata.clone();
        }
        if let Some(rights) = &self.rights {
            props.rights = rights.clone();
        }
        if let Some(nav_date) = &self.nav_date {
            props.nav_date = nav_date.clone();
        }
        if let Some(behavior) = &self.behavior {
            props.behavior = behavior.clone();
        }
        if let Some(direction) = &self.viewing_direction {
            props.viewing_direction = *direction;
        }

        let mismatch = |field: &'static str| StoreError::InvalidPatch {
            id: entity.id().to_string(),
            field,
            kind: entity.kind(),
        };

        if let Some(dimensions) = self.dimensions {
            match &mut next {
                Entity::Canvas(canvas) => canvas.dimensions = dimensions,
                _ => return Err(mismatch("dimensions")),
            }
        }

        if self.motivation.is_some() || self.body.is_some() || self.target.is_some() {
            let Entity::Annotation(annotation) = &mut next else {
                let field = if self.motivation.is_some() {
                    "motivation"
                } else if self.body.is_some() {
                    "body"
                } else {
                    "target"
                };
                return Err(mismatch(field));
            };
            if let Some(motivation) = self.motivation {
                annotation.motivation = motivation;
            }
            if let Some(body) = &self.body {
                annotation.body = body.clone();
            }
            if let Some(target) = &self.target {
                annotation.target = target.clone();
            }
        }

        Ok(next)
    }
}
