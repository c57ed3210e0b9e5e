//! Nested document shape
//!
//! This is the tree as ingest hands it over and as persistence/export
//! consume it. Every container has a fixed, kind-specific set of child
//! lists; [`NodeRef::children`] selects them by tag.

use crate::behavior::Motivation;
use crate::entity::PagePurpose;
use crate::kind::EntityKind;
use crate::language::LanguageMap;
use crate::properties::{Dimensions, Properties};
use serde::{Deserialize, Serialize};

/// Any node of the nested document, tagged by `"type"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Resource {
    Collection(Collection),
    Manifest(Manifest),
    Canvas(Canvas),
    Range(Range),
    AnnotationPage(AnnotationPage),
    Annotation(Annotation),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,

    #[serde(flatten)]
    pub props: Properties,

    /// Owned children. `None` means the container itself is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<CollectionItem>>,

    /// Manifests listed here without being owned
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CollectionItem {
    Collection(Collection),
    Manifest(Manifest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,

    #[serde(flatten)]
    pub props: Properties,

    #[serde(default)]
    pub items: Vec<Canvas>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structures: Vec<Range>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub id: String,

    #[serde(flatten)]
    pub props: Properties,

    #[serde(flatten)]
    pub dimensions: Dimensions,

    /// Pages holding the primary painted content
    #[serde(default)]
    pub items: Vec<AnnotationPage>,

    /// Pages holding everything else (comments, transcriptions, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub id: String,

    #[serde(flatten)]
    pub props: Properties,

    #[serde(default)]
    pub items: Vec<RangeItem>,
}

/// Member of a range: a canvas reference or an owned sub-range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RangeItem {
    Canvas(CanvasRef),
    Range(Range),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPage {
    pub id: String,

    #[serde(flatten)]
    pub props: Properties,

    /// Declared purpose; when absent it is inferred from placement and contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<PagePurpose>,

    #[serde(default)]
    pub items: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,

    #[serde(flatten)]
    pub props: Properties,

    pub motivation: Motivation,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub body: serde_json::Value,

    pub target: String,
}

impl Collection {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            props: Properties::default(),
            items: Some(Vec::new()),
            members: Vec::new(),
        }
    }

    pub fn with_label(mut self, locale: &str, label: &str) -> Self {
        self.props.label = Some(LanguageMap::single(locale, label));
        self
    }

    pub fn with_item(mut self, item: CollectionItem) -> Self {
        self.items.get_or_insert_with(Vec::new).push(item);
        self
    }
}

impl Manifest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            props: Properties::default(),
            items: Vec::new(),
            structures: Vec::new(),
        }
    }

    pub fn with_label(mut self, locale: &str, label: &str) -> Self {
        self.props.label = Some(LanguageMap::single(locale, label));
        self
    }

    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.items.push(canvas);
        self
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.structures.push(range);
        self
    }
}

impl Canvas {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            props: Properties::default(),
            dimensions: Dimensions::new(width, height),
            items: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn with_label(mut self, locale: &str, label: &str) -> Self {
        self.props.label = Some(LanguageMap::single(locale, label));
        self
    }

    pub fn with_page(mut self, page: AnnotationPage) -> Self {
        self.items.push(page);
        self
    }

    pub fn with_annotation_page(mut self, page: AnnotationPage) -> Self {
        self.annotations.push(page);
        self
    }
}

impl Range {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            props: Properties::default(),
            items: Vec::new(),
        }
    }

    pub fn with_canvas_ref(mut self, canvas_id: impl Into<String>) -> Self {
        self.items.push(RangeItem::Canvas(CanvasRef { id: canvas_id.into() }));
        self
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.items.push(RangeItem::Range(range));
        self
    }
}

impl AnnotationPage {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            props: Properties::default(),
            purpose: None,
            items: Vec::new(),
        }
    }

    pub fn with_purpose(mut self, purpose: PagePurpose) -> Self {
        self.purpose = Some(purpose);
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.items.push(annotation);
        self
    }
}

impl Annotation {
    pub fn new(
        id: impl Into<String>,
        motivation: Motivation,
        target: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            props: Properties::default(),
            motivation,
            body,
            target: target.into(),
        }
    }
}

impl Resource {
    pub fn as_node(&self) -> NodeRef<'_> {
        match self {
            Resource::Collection(c) => NodeRef::Collection(c),
            Resource::Manifest(m) => NodeRef::Manifest(m),
            Resource::Canvas(c) => NodeRef::Canvas(c),
            Resource::Range(r) => NodeRef::Range(r),
            Resource::AnnotationPage(p) => NodeRef::AnnotationPage(p),
            Resource::Annotation(a) => NodeRef::Annotation(a),
        }
    }

    pub fn as_node_mut(&mut self) -> NodeMut<'_> {
        match self {
            Resource::Collection(c) => NodeMut::Collection(c),
            Resource::Manifest(m) => NodeMut::Manifest(m),
            Resource::Canvas(c) => NodeMut::Canvas(c),
            Resource::Range(r) => NodeMut::Range(r),
            Resource::AnnotationPage(p) => NodeMut::AnnotationPage(p),
            Resource::Annotation(a) => NodeMut::Annotation(a),
        }
    }

    pub fn id(&self) -> &str {
        self.as_node().id()
    }

    pub fn kind(&self) -> EntityKind {
        self.as_node().kind()
    }
}

/// Borrowed view of one node, selected by kind
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Collection(&'a Collection),
    Manifest(&'a Manifest),
    Canvas(&'a Canvas),
    Range(&'a Range),
    AnnotationPage(&'a AnnotationPage),
    Annotation(&'a Annotation),
}

/// A node visited during a preorder walk
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub node: NodeRef<'a>,
    pub parent: Option<NodeRef<'a>>,
    pub depth: usize,
}

impl<'a> NodeRef<'a> {
    pub fn id(self) -> &'a str {
        match self {
            NodeRef::Collection(c) => &c.id,
            NodeRef::Manifest(m) => &m.id,
            NodeRef::Canvas(c) => &c.id,
            NodeRef::Range(r) => &r.id,
            NodeRef::AnnotationPage(p) => &p.id,
            NodeRef::Annotation(a) => &a.id,
        }
    }

    pub fn kind(self) -> EntityKind {
        match self {
            NodeRef::Collection(_) => EntityKind::Collection,
            NodeRef::Manifest(_) => EntityKind::Manifest,
            NodeRef::Canvas(_) => EntityKind::Canvas,
            NodeRef::Range(_) => EntityKind::Range,
            NodeRef::AnnotationPage(_) => EntityKind::AnnotationPage,
            NodeRef::Annotation(_) => EntityKind::Annotation,
        }
    }

    pub fn props(self) -> &'a Properties {
        match self {
            NodeRef::Collection(c) => &c.props,
            NodeRef::Manifest(m) => &m.props,
            NodeRef::Canvas(c) => &c.props,
            NodeRef::Range(r) => &r.props,
            NodeRef::AnnotationPage(p) => &p.props,
            NodeRef::Annotation(a) => &a.props,
        }
    }

    /// Owned children in document order
    pub fn children(self) -> Vec<NodeRef<'a>> {
        match self {
            NodeRef::Collection(c) => c
                .items
                .iter()
                .flatten()
                .map(|item| match item {
                    CollectionItem::Collection(c) => NodeRef::Collection(c),
                    CollectionItem::Manifest(m) => NodeRef::Manifest(m),
                })
                .collect(),
            NodeRef::Manifest(m) => m
                .items
                .iter()
                .map(NodeRef::Canvas)
                .chain(m.structures.iter().map(NodeRef::Range))
                .collect(),
            NodeRef::Canvas(c) => c
                .items
                .iter()
                .chain(c.annotations.iter())
                .map(NodeRef::AnnotationPage)
                .collect(),
            NodeRef::Range(r) => r
                .items
                .iter()
                .filter_map(|item| match item {
                    RangeItem::Range(r) => Some(NodeRef::Range(r)),
                    RangeItem::Canvas(_) => None,
                })
                .collect(),
            NodeRef::AnnotationPage(p) => p.items.iter().map(NodeRef::Annotation).collect(),
            NodeRef::Annotation(_) => Vec::new(),
        }
    }

    /// Preorder walk of this node and everything it owns
    pub fn walk(self) -> Vec<Visit<'a>> {
        let mut visits = Vec::new();
        let mut stack = vec![Visit {
            node: self,
            parent: None,
            depth: 0,
        }];

        while let Some(visit) = stack.pop() {
            for child in visit.node.children().into_iter().rev() {
                stack.push(Visit {
                    node: child,
                    parent: Some(visit.node),
                    depth: visit.depth + 1,
                });
            }
            visits.push(visit);
        }

        visits
    }
}

/// Mutable view of one node, selected by kind
#[derive(Debug)]
pub enum NodeMut<'a> {
    Collection(&'a mut Collection),
    Manifest(&'a mut Manifest),
    Canvas(&'a mut Canvas),
    Range(&'a mut Range),
    AnnotationPage(&'a mut AnnotationPage),
    Annotation(&'a mut Annotation),
}

impl<'a> NodeMut<'a> {
    pub fn id(&self) -> &str {
        match self {
            NodeMut::Collection(c) => &c.id,
            NodeMut::Manifest(m) => &m.id,
            NodeMut::Canvas(c) => &c.id,
            NodeMut::Range(r) => &r.id,
            NodeMut::AnnotationPage(p) => &p.id,
            NodeMut::Annotation(a) => &a.id,
        }
    }

    pub fn id_mut(&mut self) -> &mut String {
        match self {
            NodeMut::Collection(c) => &mut c.id,
            NodeMut::Manifest(m) => &mut m.id,
            NodeMut::Canvas(c) => &mut c.id,
            NodeMut::Range(r) => &mut r.id,
            NodeMut::AnnotationPage(p) => &mut p.id,
            NodeMut::Annotation(a) => &mut a.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            NodeMut::Collection(_) => EntityKind::Collection,
            NodeMut::Manifest(_) => EntityKind::Manifest,
            NodeMut::Canvas(_) => EntityKind::Canvas,
            NodeMut::Range(_) => EntityKind::Range,
            NodeMut::AnnotationPage(_) => EntityKind::AnnotationPage,
            NodeMut::Annotation(_) => EntityKind::Annotation,
        }
    }

    pub fn props_mut(&mut self) -> &mut Properties {
        match self {
            NodeMut::Collection(c) => &mut c.props,
            NodeMut::Manifest(m) => &mut m.props,
            NodeMut::Canvas(c) => &mut c.props,
            NodeMut::Range(r) => &mut r.props,
            NodeMut::AnnotationPage(p) => &mut p.props,
            NodeMut::Annotation(a) => &mut a.props,
        }
    }

    pub fn into_children(self) -> Vec<NodeMut<'a>> {
        match self {
            NodeMut::Collection(c) => c
                .items
                .iter_mut()
                .flatten()
                .map(|item| match item {
                    CollectionItem::Collection(c) => NodeMut::Collection(c),
                    CollectionItem::Manifest(m) => NodeMut::Manifest(m),
                })
                .collect(),
            NodeMut::Manifest(m) => {
                let Manifest {
                    items, structures, ..
                } = m;
                items
                    .iter_mut()
                    .map(NodeMut::Canvas)
                    .chain(structures.iter_mut().map(NodeMut::Range))
                    .collect()
            }
            NodeMut::Canvas(c) => {
                let Canvas {
                    items, annotations, ..
                } = c;
                items
                    .iter_mut()
                    .chain(annotations.iter_mut())
                    .map(NodeMut::AnnotationPage)
                    .collect()
            }
            NodeMut::Range(r) => r
                .items
                .iter_mut()
                .filter_map(|item| match item {
                    RangeItem::Range(r) => Some(NodeMut::Range(r)),
                    RangeItem::Canvas(_) => None,
                })
                .collect(),
            NodeMut::AnnotationPage(p) => p.items.iter_mut().map(NodeMut::Annotation).collect(),
            NodeMut::Annotation(_) => Vec::new(),
        }
    }

    /// Preorder walk calling `f` on every node; children are read after `f` runs.
    pub fn walk(self, mut f: impl FnMut(&mut NodeMut<'a>)) {
        let mut stack = vec![self];
        while let Some(mut node) = stack.pop() {
            f(&mut node);
            let mut children = node.into_children();
            children.reverse();
            stack.extend(children);
        }
    }
}
