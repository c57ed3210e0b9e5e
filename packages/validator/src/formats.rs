//! Format validators for loosely typed property input.
//!
//! The reducer runs these over raw JSON before touching the store; the
//! per-entity rules reuse them on already-typed documents.

use chrono::{DateTime, FixedOffset};
use folio_model::{Behavior, EntityKind, LanguageMap, MetadataEntry, ViewingDirection};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("{field} must be an object keyed by locale")]
    NotAnObject { field: String },

    #[error("'{0}' is not a valid locale key")]
    InvalidLocale(String),

    #[error("{field}[{locale}] must be an array of strings")]
    NotAStringList { field: String, locale: String },

    #[error("Metadata entry {index} must have a 'label' and a 'value' language map")]
    InvalidMetadata { index: usize },

    #[error("Metadata must be an array")]
    MetadataNotAnArray,

    #[error("'{0}' is not an absolute URI")]
    NotAbsoluteUri(String),

    #[error("'{0}' is not a valid date-time")]
    InvalidNavDate(String),

    #[error("Unknown behavior '{0}'")]
    UnknownBehavior(String),

    #[error("Behavior '{behavior}' is not allowed on {kind}")]
    IllegalBehavior { behavior: Behavior, kind: EntityKind },

    #[error("Behaviors '{first}' and '{second}' are mutually exclusive")]
    BehaviorConflict { first: Behavior, second: Behavior },

    #[error("Unknown viewing direction '{0}'")]
    UnknownViewingDirection(String),

    #[error("viewingDirection is not allowed on {0}")]
    IllegalViewingDirection(EntityKind),
}

fn locale_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(none|[a-zA-Z]{2,3}(-[a-zA-Z0-9]{2,8})*)$").expect("locale pattern compiles")
    })
}

/// Parse `{ "en": ["Title"], "none": [] }` style input
pub fn parse_language_map(field: &str, value: &Value) -> Result<LanguageMap, FormatError> {
    let Value::Object(object) = value else {
        return Err(FormatError::NotAnObject {
            field: field.to_string(),
        });
    };

    let mut entries = BTreeMap::new();
    for (locale, variants) in object {
        if !locale_pattern().is_match(locale) {
            return Err(FormatError::InvalidLocale(locale.clone()));
        }
        let not_list = || FormatError::NotAStringList {
            field: field.to_string(),
            locale: locale.clone(),
        };
        let Value::Array(variants) = variants else {
            return Err(not_list());
        };
        let strings = variants
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(not_list))
            .collect::<Result<Vec<_>, _>>()?;
        entries.insert(locale.clone(), strings);
    }

    Ok(LanguageMap(entries))
}

/// Parse a metadata list of `{label, value}` language-map pairs
pub fn parse_metadata(value: &Value) -> Result<Vec<MetadataEntry>, FormatError> {
    let Value::Array(entries) = value else {
        return Err(FormatError::MetadataNotAnArray);
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let (Some(label), Some(value)) = (entry.get("label"), entry.get("value")) else {
                return Err(FormatError::InvalidMetadata { index });
            };
            Ok(MetadataEntry {
                label: parse_language_map("label", label)
                    .map_err(|_| FormatError::InvalidMetadata { index })?,
                value: parse_language_map("value", value)
                    .map_err(|_| FormatError::InvalidMetadata { index })?,
            })
        })
        .collect()
}

/// Absolute URI: parses on its own, without a base
pub fn check_absolute_uri(value: &str) -> Result<(), FormatError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|_| FormatError::NotAbsoluteUri(value.to_string()))
}

pub fn check_rights(value: &str) -> Result<(), FormatError> {
    check_absolute_uri(value)
}

/// RFC 3339 date-time, e.g. `1856-01-01T00:00:00Z`
pub fn check_nav_date(value: &str) -> Result<DateTime<FixedOffset>, FormatError> {
    DateTime::parse_from_rfc3339(value).map_err(|_| FormatError::InvalidNavDate(value.to_string()))
}

/// Parse behavior names for an entity of `kind`, checking the allow-list
/// and the mutually exclusive pairs.
pub fn parse_behaviors(kind: EntityKind, values: &[String]) -> Result<Vec<Behavior>, FormatError> {
    let mut behaviors = Vec::with_capacity(values.len());
    for value in values {
        let behavior: Behavior = value
            .parse()
            .map_err(|_| FormatError::UnknownBehavior(value.clone()))?;
        if !behavior.is_allowed_for(kind) {
            return Err(FormatError::IllegalBehavior { behavior, kind });
        }
        if !behaviors.contains(&behavior) {
            behaviors.push(behavior);
        }
    }

    check_behavior_conflicts(&behaviors)?;
    Ok(behaviors)
}

pub fn check_behavior_conflicts(behaviors: &[Behavior]) -> Result<(), FormatError> {
    match Behavior::find_conflict(behaviors) {
        Some((first, second)) => Err(FormatError::BehaviorConflict { first, second }),
        None => Ok(()),
    }
}

pub fn parse_viewing_direction(kind: EntityKind, value: &str) -> Result<ViewingDirection, FormatError> {
    let direction: ViewingDirection = value
        .parse()
        .map_err(|_| FormatError::UnknownViewingDirection(value.to_string()))?;
    if !ViewingDirection::is_allowed_for(kind) {
        return Err(FormatError::IllegalViewingDirection(kind));
    }
    Ok(direction)
}
