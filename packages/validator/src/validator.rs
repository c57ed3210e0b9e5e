use crate::issue::{Category, Issue, Severity};
use crate::rules::RuleRegistry;
use folio_model::{Entity, Resource};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Options for configuring validation
#[derive(Debug, Default)]
pub struct ValidateOptions {
    /// Custom rule registry (uses default if None)
    pub registry: Option<RuleRegistry>,
}

/// Validate a whole document: every entity on its own, then the tree-aware rules
pub fn validate_document(document: &Resource, options: ValidateOptions) -> Vec<Issue> {
    let registry = options.registry.unwrap_or_default();
    let root = document.as_node();
    let mut issues = Vec::new();

    for visit in root.walk() {
        let entity = Entity::from_node(visit.node, visit.parent);
        for rule in registry.rules() {
            issues.extend(rule.check_entity(&entity));
        }
    }

    for rule in registry.rules() {
        issues.extend(rule.check_tree(root));
    }

    debug!(root = %document.id(), issues = issues.len(), "Validated document");
    issues
}

/// Per-entity checks only, with the default rules
pub fn validate_entity(entity: &Entity) -> Vec<Issue> {
    RuleRegistry::new()
        .rules()
        .iter()
        .flat_map(|rule| rule.check_entity(entity))
        .collect()
}

/// Issue counts for a dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub fixable: usize,
    pub by_category: BTreeMap<Category, usize>,
}

impl Summary {
    pub fn of(issues: &[Issue]) -> Self {
        let mut summary = Summary::default();
        for issue in issues {
            match issue.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
            }
            if issue.fixable {
                summary.fixable += 1;
            }
            *summary.by_category.entry(issue.category).or_default() += 1;
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}
