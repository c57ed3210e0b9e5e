use crate::formats::{check_nav_date, check_rights};
use crate::issue::{Category, Issue, IssueCode};
use crate::rules::Rule;
use folio_model::Entity;

pub struct RightsRule;

impl Rule for RightsRule {
    fn name(&self) -> &'static str {
        "rights"
    }

    fn description(&self) -> &'static str {
        "rights must be an absolute URI"
    }

    fn check_entity(&self, entity: &Entity) -> Vec<Issue> {
        let Some(rights) = &entity.props().rights else {
            return Vec::new();
        };
        match check_rights(rights) {
            Ok(()) => Vec::new(),
            Err(err) => vec![Issue::error(
                entity.id(),
                entity.kind(),
                IssueCode::InvalidRights,
                Category::Metadata,
                format!("Invalid rights on '{}': {}", entity.id(), err),
            )],
        }
    }
}

pub struct NavDateRule;

impl Rule for NavDateRule {
    fn name(&self) -> &'static str {
        "nav-date"
    }

    fn description(&self) -> &'static str {
        "navDate must be an RFC 3339 date-time"
    }

    fn check_entity(&self, entity: &Entity) -> Vec<Issue> {
        let Some(nav_date) = &entity.props().nav_date else {
            return Vec::new();
        };
        match check_nav_date(nav_date) {
            Ok(_) => Vec::new(),
            Err(err) => vec![Issue::error(
                entity.id(),
                entity.kind(),
                IssueCode::InvalidNavDate,
                Category::Metadata,
                format!("Invalid navDate on '{}': {}", entity.id(), err),
            )],
        }
    }
}
