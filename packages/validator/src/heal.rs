//! Deterministic remedies for fixable issues.
//!
//! Each [`IssueCode`] marked fixable maps to exactly one remedy. Remedies
//! edit the nested document in place; the caller re-validates afterwards.

use crate::issue::{Issue, IssueCode};
use folio_model::{LanguageMap, NodeMut, Resource};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Issue {code:?} on {id} has no automatic fix")]
    NotFixable { id: String, code: IssueCode },

    #[error("Issue {code:?} does not apply to {id}")]
    NotApplicable { id: String, code: IssueCode },
}

/// A remedy that could not be applied
#[derive(Debug, Clone, PartialEq)]
pub struct FixFailure {
    pub issue: Issue,
    pub error: FixError,
}

/// Outcome of [`fix_all`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixReport {
    pub fixed: Vec<Issue>,
    pub errors: Vec<FixFailure>,
}

impl FixReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Label synthesized from the last path segment of an id
pub fn label_from_id(id: &str) -> String {
    id.trim_end_matches(['/', '#'])
        .rsplit(['/', '#', ':'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(id)
        .to_string()
}

/// Apply the remedy for one issue
pub fn fix_issue(document: &mut Resource, issue: &Issue) -> Result<(), FixError> {
    if !issue.fixable || !issue.code.is_fixable() {
        return Err(FixError::NotFixable {
            id: issue.entity_id.clone(),
            code: issue.code,
        });
    }

    if issue.code == IssueCode::DuplicateId {
        return rename_duplicates(document, &issue.entity_id);
    }

    let mut outcome = Err(FixError::EntityNotFound(issue.entity_id.clone()));
    let mut done = false;
    document.as_node_mut().walk(|node| {
        if done || node.id() != issue.entity_id {
            return;
        }
        done = true;
        outcome = apply_remedy(node, issue);
    });

    if outcome.is_ok() {
        debug!(id = %issue.entity_id, code = ?issue.code, "Applied fix");
    }
    outcome
}

/// Apply every fixable remedy. A failing remedy is recorded and the rest
/// still run.
pub fn fix_all(document: &mut Resource, issues: &[Issue]) -> FixReport {
    let mut report = FixReport::default();

    for issue in issues.iter().filter(|i| i.fixable) {
        match fix_issue(document, issue) {
            Ok(()) => report.fixed.push(issue.clone()),
            Err(error) => report.errors.push(FixFailure {
                issue: issue.clone(),
                error,
            }),
        }
    }

    info!(fixed = report.fixed.len(), failed = report.errors.len(), "Applied fixes");
    report
}

fn apply_remedy(node: &mut NodeMut<'_>, issue: &Issue) -> Result<(), FixError> {
    let kind = node.kind();
    let not_applicable = || FixError::NotApplicable {
        id: issue.entity_id.clone(),
        code: issue.code,
    };

    match issue.code {
        IssueCode::MissingLabel => {
            let label = label_from_id(node.id());
            node.props_mut().label = Some(LanguageMap::single("none", label));
        }
        IssueCode::MissingDimension | IssueCode::InvalidDimension => {
            let NodeMut::Canvas(canvas) = node else {
                return Err(not_applicable());
            };
            let dims = &mut canvas.dimensions;
            if dims.width.unwrap_or(0) == 0 {
                dims.width = Some(1);
            }
            if dims.height.unwrap_or(0) == 0 {
                dims.height = Some(1);
            }
            if dims.duration.is_some_and(|d| !d.is_finite() || d <= 0.0) {
                dims.duration = None;
            }
        }
        IssueCode::IllegalBehavior => {
            node.props_mut().behavior.retain(|b| b.is_allowed_for(kind));
        }
        IssueCode::IllegalViewingDirection => {
            node.props_mut().viewing_direction = None;
        }
        IssueCode::MissingItems => {
            let NodeMut::Collection(collection) = node else {
                return Err(not_applicable());
            };
            collection.items.get_or_insert_with(Vec::new);
        }
        _ => return Err(not_applicable()),
    }

    Ok(())
}

/// Keep the first occurrence of `id`; suffix later ones `-2`, `-3`, ...
fn rename_duplicates(document: &mut Resource, id: &str) -> Result<(), FixError> {
    let mut taken: HashSet<String> = document
        .as_node()
        .walk()
        .iter()
        .map(|visit| visit.node.id().to_string())
        .collect();
    if !taken.contains(id) {
        return Err(FixError::EntityNotFound(id.to_string()));
    }

    let mut seen = 0usize;
    let mut suffix = 1usize;
    document.as_node_mut().walk(|node| {
        if node.id() != id {
            return;
        }
        seen += 1;
        if seen == 1 {
            return;
        }
        let renamed = loop {
            suffix += 1;
            let candidate = format!("{}-{}", id, suffix);
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(renamed.clone());
        *node.id_mut() = renamed;
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{Category, Severity};
    use folio_model::{Canvas, Collection, EntityKind, Manifest};

    fn issue(id: &str, kind: EntityKind, code: IssueCode) -> Issue {
        Issue {
            entity_id: id.to_string(),
            kind,
            code,
            message: String::new(),
            severity: Severity::Error,
            category: Category::Structure,
            fixable: code.is_fixable(),
        }
    }

    #[test]
    fn test_label_from_trailing_segment() {
        assert_eq!(label_from_id("https://example.org/iiif/letter-12"), "letter-12");
        assert_eq!(label_from_id("https://example.org/iiif/letter-12/"), "letter-12");
        assert_eq!(label_from_id("urn:uuid:1234"), "1234");
        assert_eq!(label_from_id("plain"), "plain");
    }

    #[test]
    fn test_duplicates_get_numbered_suffixes() {
        let mut doc = Resource::Manifest(
            Manifest::new("m1")
                .with_canvas(Canvas::new("x1", 1, 1))
                .with_canvas(Canvas::new("x1", 1, 1))
                .with_canvas(Canvas::new("x1-2", 1, 1))
                .with_canvas(Canvas::new("x1", 1, 1)),
        );

        fix_issue(&mut doc, &issue("x1", EntityKind::Canvas, IssueCode::DuplicateId)).unwrap();

        let Resource::Manifest(manifest) = &doc else {
            panic!("expected manifest");
        };
        let ids: Vec<&str> = manifest.items.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["x1", "x1-3", "x1-2", "x1-4"]);
    }

    #[test]
    fn test_missing_items_are_injected() {
        let mut collection = Collection::new("root");
        collection.items = None;
        let mut doc = Resource::Collection(collection);

        fix_issue(&mut doc, &issue("root", EntityKind::Collection, IssueCode::MissingItems)).unwrap();
        assert!(matches!(&doc, Resource::Collection(c) if c.items == Some(Vec::new())));
    }

    #[test]
    fn test_unfixable_issue_is_refused() {
        let mut doc = Resource::Manifest(Manifest::new("m1"));
        assert!(matches!(
            fix_issue(&mut doc, &issue("m1", EntityKind::Manifest, IssueCode::EmptyManifest)),
            Err(FixError::NotFixable { .. })
        ));
    }
}
