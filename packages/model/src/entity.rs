//! Flat entity records
//!
//! One record per node with children held out of line. Kind-specific data
//! lives in the variant; everything shared is in [`Properties`].

use crate::behavior::Motivation;
use crate::document::{Annotation, AnnotationPage, NodeRef, RangeItem};
use crate::kind::EntityKind;
use crate::properties::{Dimensions, Properties};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entity {
    Collection(CollectionEntity),
    Manifest(ManifestEntity),
    Canvas(CanvasEntity),
    Range(RangeEntity),
    AnnotationPage(PageEntity),
    Annotation(AnnotationEntity),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEntity {
    pub id: String,
    pub props: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntity {
    pub id: String,
    pub props: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasEntity {
    pub id: String,
    pub props: Properties,
    pub dimensions: Dimensions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeEntity {
    pub id: String,
    pub props: Properties,
    /// Ordered members; `Range` entries are owned children, `Canvas` entries are references
    pub items: Vec<RangeItemRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum RangeItemRef {
    Canvas(String),
    Range(String),
}

impl RangeItemRef {
    pub fn id(&self) -> &str {
        match self {
            RangeItemRef::Canvas(id) | RangeItemRef::Range(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntity {
    pub id: String,
    pub props: Properties,
    pub purpose: PagePurpose,
    /// The purpose was stated by the document or the editor, not inferred
    #[serde(default)]
    pub declared: bool,
}

/// Declared purpose of an annotation page.
///
/// New annotations are matched against this declaration, never against the
/// page's current contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "motivation")]
pub enum PagePurpose {
    /// Primary painted content; only `painting` annotations may join
    Painting,
    /// Annotations of one non-primary motivation
    Motivated(Motivation),
    /// Ingested page with no single declared motivation; never auto-selected
    Mixed,
}

impl PagePurpose {
    /// Purpose of a page that does not declare one.
    ///
    /// Pages in a canvas's `items` list paint. Elsewhere a uniform
    /// non-painting motivation is taken as the purpose; anything else
    /// (empty, mixed, or stray painting) is `Mixed`.
    pub fn inferred(page: &AnnotationPage, painted: bool) -> PagePurpose {
        if painted {
            return PagePurpose::Painting;
        }
        let mut motivations = page.items.iter().map(|a| a.motivation);
        match motivations.next() {
            Some(first) if !first.is_primary() && motivations.all(|m| m == first) => {
                PagePurpose::Motivated(first)
            }
            _ => PagePurpose::Mixed,
        }
    }

    /// Purpose a new annotation with `motivation` needs
    pub fn for_motivation(motivation: Motivation) -> PagePurpose {
        if motivation.is_primary() {
            PagePurpose::Painting
        } else {
            PagePurpose::Motivated(motivation)
        }
    }

    pub fn is_primary(self) -> bool {
        self == PagePurpose::Painting
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEntity {
    pub id: String,
    pub props: Properties,
    pub motivation: Motivation,
    pub body: serde_json::Value,
    pub target: String,
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Collection(e) => &e.id,
            Entity::Manifest(e) => &e.id,
            Entity::Canvas(e) => &e.id,
            Entity::Range(e) => &e.id,
            Entity::AnnotationPage(e) => &e.id,
            Entity::Annotation(e) => &e.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Collection(_) => EntityKind::Collection,
            Entity::Manifest(_) => EntityKind::Manifest,
            Entity::Canvas(_) => EntityKind::Canvas,
            Entity::Range(_) => EntityKind::Range,
            Entity::AnnotationPage(_) => EntityKind::AnnotationPage,
            Entity::Annotation(_) => EntityKind::Annotation,
        }
    }

    pub fn props(&self) -> &Properties {
        match self {
            Entity::Collection(e) => &e.props,
            Entity::Manifest(e) => &e.props,
            Entity::Canvas(e) => &e.props,
            Entity::Range(e) => &e.props,
            Entity::AnnotationPage(e) => &e.props,
            Entity::Annotation(e) => &e.props,
        }
    }

    pub fn props_mut(&mut self) -> &mut Properties {
        match self {
            Entity::Collection(e) => &mut e.props,
            Entity::Manifest(e) => &mut e.props,
            Entity::Canvas(e) => &mut e.props,
            Entity::Range(e) => &mut e.props,
            Entity::AnnotationPage(e) => &mut e.props,
            Entity::Annotation(e) => &mut e.props,
        }
    }

    /// Shallow record for a nested node.
    ///
    /// `parent` decides the declared purpose of annotation pages: a page in
    /// its canvas's `items` list is primary content.
    pub fn from_node(node: NodeRef<'_>, parent: Option<NodeRef<'_>>) -> Entity {
        match node {
            NodeRef::Collection(c) => Entity::Collection(CollectionEntity {
                id: c.id.clone(),
                props: c.props.clone(),
            }),
            NodeRef::Manifest(m) => Entity::Manifest(ManifestEntity {
                id: m.id.clone(),
                props: m.props.clone(),
            }),
            NodeRef::Canvas(c) => Entity::Canvas(CanvasEntity {
                id: c.id.clone(),
                props: c.props.clone(),
                dimensions: c.dimensions,
            }),
            NodeRef::Range(r) => Entity::Range(RangeEntity {
                id: r.id.clone(),
                props: r.props.clone(),
                items: r
                    .items
                    .iter()
                    .map(|item| match item {
                        RangeItem::Canvas(c) => RangeItemRef::Canvas(c.id.clone()),
                        RangeItem::Range(r) => RangeItemRef::Range(r.id.clone()),
                    })
                    .collect(),
            }),
            NodeRef::AnnotationPage(p) => {
                let painted = match parent {
                    Some(NodeRef::Canvas(canvas)) => {
                        canvas.items.iter().any(|candidate| std::ptr::eq(candidate, p))
                    }
                    _ => false,
                };
                Entity::AnnotationPage(PageEntity {
                    id: p.id.clone(),
                    props: p.props.clone(),
                    purpose: p.purpose.unwrap_or_else(|| PagePurpose::inferred(p, painted)),
                    declared: p.purpose.is_some(),
                })
            }
            NodeRef::Annotation(a) => Entity::Annotation(AnnotationEntity::from(a)),
        }
    }
}

impl From<&Annotation> for AnnotationEntity {
    fn from(a: &Annotation) -> Self {
        Self {
            id: a.id.clone(),
            props: a.props.clone(),
            motivation: a.motivation,
            body: a.body.clone(),
            target: a.target.clone(),
        }
    }
}
