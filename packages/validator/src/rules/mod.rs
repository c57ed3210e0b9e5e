mod enumerated;
mod identity;
mod metadata;
mod required;
mod structure;

pub use enumerated::{BehaviorRule, ViewingDirectionRule};
pub use identity::{DuplicateIdRule, IdentifierRule};
pub use metadata::{NavDateRule, RightsRule};
pub use required::{AnnotationTargetRule, DimensionsRule, RequiredLabelRule};
pub use structure::{BehaviorInheritanceRule, CollectionItemsRule, EmptyManifestRule, PaintedContentRule};

use crate::issue::Issue;
use folio_model::{Entity, NodeRef};

/// Trait for implementing validation rules
pub trait Rule {
    /// Unique identifier for this rule
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Check one entity on its own
    fn check_entity(&self, _entity: &Entity) -> Vec<Issue> {
        Vec::new()
    }

    /// Check the whole document once, from its root
    fn check_tree(&self, _root: NodeRef<'_>) -> Vec<Issue> {
        Vec::new()
    }
}

/// Registry of validation rules
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    /// Create a new registry with all built-in rules
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(IdentifierRule),
                Box::new(RequiredLabelRule),
                Box::new(DimensionsRule),
                Box::new(AnnotationTargetRule),
                Box::new(BehaviorRule),
                Box::new(ViewingDirectionRule),
                Box::new(RightsRule),
                Box::new(NavDateRule),
                Box::new(DuplicateIdRule),
                Box::new(BehaviorInheritanceRule),
                Box::new(PaintedContentRule),
                Box::new(EmptyManifestRule),
                Box::new(CollectionItemsRule),
            ],
        }
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    /// Create an empty registry
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &format!("{} rules", self.rules.len()))
            .finish()
    }
}
