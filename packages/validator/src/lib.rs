//! # Folio Validator
//!
//! Two tiers of checks over a nested document:
//!
//! - **Per-entity** rules see one flat [`folio_model::Entity`] at a time
//!   (identifier format, required properties, dimensions, enumerated values).
//! - **Tree** rules see the whole document once (duplicate ids, behavior
//!   inheritance, painted content, structural completeness).
//!
//! Fixable issues have one deterministic remedy each; see [`fix_issue`] and
//! [`fix_all`]. The format validators in [`formats`] are shared with the
//! editor's reducer.

pub mod formats;
mod heal;
mod issue;
mod rules;
mod validator;

pub use formats::FormatError;
pub use heal::{fix_all, fix_issue, label_from_id, FixError, FixFailure, FixReport};
pub use issue::{Category, Issue, IssueCode, Severity};
pub use rules::{Rule, RuleRegistry};
pub use validator::{validate_document, validate_entity, Summary, ValidateOptions};
