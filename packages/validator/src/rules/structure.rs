use crate::issue::{Category, Issue, IssueCode};
use crate::rules::Rule;
use folio_model::{Behavior, EntityKind, Motivation, NodeRef};

/// A child's behaviors must not contradict what it inherits from its parent
pub struct BehaviorInheritanceRule;

impl Rule for BehaviorInheritanceRule {
    fn name(&self) -> &'static str {
        "behavior-inheritance"
    }

    fn description(&self) -> &'static str {
        "Child behaviors must be consistent with inherited parent behaviors"
    }

    fn check_tree(&self, root: NodeRef<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();

        for visit in root.walk() {
            let Some(parent) = visit.parent else {
                continue;
            };
            let child = visit.node;
            if !Behavior::inherits(parent.kind(), child.kind()) {
                continue;
            }

            for own in &child.props().behavior {
                let clash = parent
                    .props()
                    .behavior
                    .iter()
                    .find(|inherited| own.conflicts_with(**inherited));
                if let Some(inherited) = clash {
                    issues.push(Issue::warning(
                        child.id(),
                        child.kind(),
                        IssueCode::BehaviorNotInherited,
                        Category::Metadata,
                        format!(
                            "{} '{}' declares '{}' but inherits '{}' from {} '{}'",
                            child.kind(),
                            child.id(),
                            own,
                            inherited,
                            parent.kind(),
                            parent.id()
                        ),
                    ));
                }
            }
        }

        issues
    }
}

/// Canvases should carry painted content
pub struct PaintedContentRule;

impl Rule for PaintedContentRule {
    fn name(&self) -> &'static str {
        "painted-content"
    }

    fn description(&self) -> &'static str {
        "Canvases should have at least one painting annotation"
    }

    fn check_tree(&self, root: NodeRef<'_>) -> Vec<Issue> {
        root.walk()
            .into_iter()
            .filter_map(|visit| match visit.node {
                NodeRef::Canvas(canvas) => {
                    let painted = canvas
                        .items
                        .iter()
                        .flat_map(|page| page.items.iter())
                        .any(|a| a.motivation == Motivation::Painting);
                    (!painted).then(|| {
                        Issue::warning(
                            &canvas.id,
                            EntityKind::Canvas,
                            IssueCode::MissingPaintedContent,
                            Category::Content,
                            format!("Canvas '{}' has no painted content", canvas.id),
                        )
                    })
                }
                _ => None,
            })
            .collect()
    }
}

pub struct EmptyManifestRule;

impl Rule for EmptyManifestRule {
    fn name(&self) -> &'static str {
        "empty-manifest"
    }

    fn description(&self) -> &'static str {
        "Manifests must contain at least one canvas"
    }

    fn check_tree(&self, root: NodeRef<'_>) -> Vec<Issue> {
        root.walk()
            .into_iter()
            .filter_map(|visit| match visit.node {
                NodeRef::Manifest(manifest) if manifest.items.is_empty() => Some(Issue::error(
                    &manifest.id,
                    EntityKind::Manifest,
                    IssueCode::EmptyManifest,
                    Category::Structure,
                    format!("Manifest '{}' has no canvases", manifest.id),
                )),
                _ => None,
            })
            .collect()
    }
}

/// A collection must have an `items` list, even an empty one
pub struct CollectionItemsRule;

impl Rule for CollectionItemsRule {
    fn name(&self) -> &'static str {
        "collection-items"
    }

    fn description(&self) -> &'static str {
        "Collections must have an items list"
    }

    fn check_tree(&self, root: NodeRef<'_>) -> Vec<Issue> {
        root.walk()
            .into_iter()
            .filter_map(|visit| match visit.node {
                NodeRef::Collection(collection) if collection.items.is_none() => Some(Issue::error(
                    &collection.id,
                    EntityKind::Collection,
                    IssueCode::MissingItems,
                    Category::Structure,
                    format!("Collection '{}' is missing its items list", collection.id),
                )),
                _ => None,
            })
            .collect()
    }
}
