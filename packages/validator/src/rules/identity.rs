use crate::formats::check_absolute_uri;
use crate::issue::{Category, Issue, IssueCode};
use crate::rules::Rule;
use folio_model::{Entity, EntityKind, NodeRef};
use std::collections::HashMap;

/// Every id must be an absolute URI
pub struct IdentifierRule;

impl Rule for IdentifierRule {
    fn name(&self) -> &'static str {
        "identifier"
    }

    fn description(&self) -> &'static str {
        "Entity ids must be absolute URIs"
    }

    fn check_entity(&self, entity: &Entity) -> Vec<Issue> {
        match check_absolute_uri(entity.id()) {
            Ok(()) => Vec::new(),
            Err(_) => vec![Issue::error(
                entity.id(),
                entity.kind(),
                IssueCode::InvalidId,
                Category::Identity,
                format!("{} id '{}' is not an absolute URI", entity.kind(), entity.id()),
            )],
        }
    }
}

/// Ids must be unique across the whole document; one issue per repeated id
pub struct DuplicateIdRule;

impl Rule for DuplicateIdRule {
    fn name(&self) -> &'static str {
        "duplicate-id"
    }

    fn description(&self) -> &'static str {
        "Entity ids must be unique across the document"
    }

    fn check_tree(&self, root: NodeRef<'_>) -> Vec<Issue> {
        let mut counts: HashMap<&str, (usize, EntityKind)> = HashMap::new();
        let mut order = Vec::new();
        for visit in root.walk() {
            let entry = counts.entry(visit.node.id()).or_insert_with(|| {
                order.push(visit.node.id());
                (0, visit.node.kind())
            });
            entry.0 += 1;
        }

        order
            .into_iter()
            .filter_map(|id| {
                let (count, kind) = counts[id];
                (count > 1).then(|| {
                    Issue::error(
                        id,
                        kind,
                        IssueCode::DuplicateId,
                        Category::Identity,
                        format!("Id '{}' is used by {} entities", id, count),
                    )
                })
            })
            .collect()
    }
}
