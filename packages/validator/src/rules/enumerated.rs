use crate::issue::{Category, Issue, IssueCode};
use crate::rules::Rule;
use folio_model::{Behavior, Entity, ViewingDirection};

/// Behaviors must be on the kind's allow-list and must not exclude each other
pub struct BehaviorRule;

impl Rule for BehaviorRule {
    fn name(&self) -> &'static str {
        "behavior"
    }

    fn description(&self) -> &'static str {
        "Behavior values must be legal for the entity kind and mutually compatible"
    }

    fn check_entity(&self, entity: &Entity) -> Vec<Issue> {
        let kind = entity.kind();
        let behaviors = &entity.props().behavior;
        let mut issues = Vec::new();

        let illegal: Vec<&str> = behaviors
            .iter()
            .filter(|b| !b.is_allowed_for(kind))
            .map(|b| b.as_str())
            .collect();
        if !illegal.is_empty() {
            issues.push(Issue::error(
                entity.id(),
                kind,
                IssueCode::IllegalBehavior,
                Category::Metadata,
                format!("Behavior {} not allowed on {}", illegal.join(", "), kind),
            ));
        }

        if let Some((first, second)) = Behavior::find_conflict(behaviors) {
            issues.push(Issue::error(
                entity.id(),
                kind,
                IssueCode::BehaviorConflict,
                Category::Metadata,
                format!("Behaviors '{}' and '{}' are mutually exclusive", first, second),
            ));
        }

        issues
    }
}

pub struct ViewingDirectionRule;

impl Rule for ViewingDirectionRule {
    fn name(&self) -> &'static str {
        "viewing-direction"
    }

    fn description(&self) -> &'static str {
        "viewingDirection is only legal on collections, manifests and ranges"
    }

    fn check_entity(&self, entity: &Entity) -> Vec<Issue> {
        match entity.props().viewing_direction {
            Some(direction) if !ViewingDirection::is_allowed_for(entity.kind()) => vec![Issue::error(
                entity.id(),
                entity.kind(),
                IssueCode::IllegalViewingDirection,
                Category::Metadata,
                format!("viewingDirection '{}' is not allowed on {}", direction.as_str(), entity.kind()),
            )],
            _ => Vec::new(),
        }
    }
}
