use folio_model::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Identity,
    Structure,
    Metadata,
    Content,
}

/// What went wrong, independent of the message wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    InvalidId,
    DuplicateId,
    MissingLabel,
    MissingDimension,
    InvalidDimension,
    IllegalBehavior,
    BehaviorConflict,
    BehaviorNotInherited,
    IllegalViewingDirection,
    InvalidRights,
    InvalidNavDate,
    MissingTarget,
    MissingPaintedContent,
    EmptyManifest,
    MissingItems,
}

impl IssueCode {
    /// Codes with a deterministic remedy
    pub fn is_fixable(self) -> bool {
        matches!(
            self,
            IssueCode::DuplicateId
                | IssueCode::MissingLabel
                | IssueCode::MissingDimension
                | IssueCode::InvalidDimension
                | IssueCode::IllegalBehavior
                | IssueCode::IllegalViewingDirection
                | IssueCode::MissingItems
        )
    }
}

/// One finding against one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub entity_id: String,
    pub kind: EntityKind,
    pub code: IssueCode,
    pub message: String,
    pub severity: Severity,
    pub category: Category,
    pub fixable: bool,
}

impl Issue {
    pub fn error(
        entity_id: impl Into<String>,
        kind: EntityKind,
        code: IssueCode,
        category: Category,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind,
            code,
            message: message.into(),
            severity: Severity::Error,
            category,
            fixable: code.is_fixable(),
        }
    }

    pub fn warning(
        entity_id: impl Into<String>,
        kind: EntityKind,
        code: IssueCode,
        category: Category,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(entity_id, kind, code, category, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} [{}]", level, self.message, self.entity_id)
    }
}
