use serde::{Deserialize, Serialize};
use std::fmt;

/// The six kinds of node in the resource graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Collection,
    Manifest,
    Canvas,
    Range,
    AnnotationPage,
    Annotation,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Collection,
        EntityKind::Manifest,
        EntityKind::Canvas,
        EntityKind::Range,
        EntityKind::AnnotationPage,
        EntityKind::Annotation,
    ];

    /// Kinds this kind may own as children.
    pub fn allowed_children(self) -> &'static [EntityKind] {
        match self {
            EntityKind::Collection => &[EntityKind::Collection, EntityKind::Manifest],
            EntityKind::Manifest => &[EntityKind::Canvas, EntityKind::Range],
            EntityKind::Canvas => &[EntityKind::AnnotationPage],
            EntityKind::Range => &[EntityKind::Range],
            EntityKind::AnnotationPage => &[EntityKind::Annotation],
            EntityKind::Annotation => &[],
        }
    }

    pub fn can_contain(self, child: EntityKind) -> bool {
        self.allowed_children().contains(&child)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Collection => "Collection",
            EntityKind::Manifest => "Manifest",
            EntityKind::Canvas => "Canvas",
            EntityKind::Range => "Range",
            EntityKind::AnnotationPage => "AnnotationPage",
            EntityKind::Annotation => "Annotation",
        }
    }

    /// Human-readable list of legal child kinds, e.g. `Collection, Manifest`.
    pub fn describe_children(self) -> String {
        let allowed = self.allowed_children();
        if allowed.is_empty() {
            return "none".to_string();
        }
        allowed
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
