use crate::behavior::{Behavior, ViewingDirection};
use crate::language::LanguageMap;
use serde::{Deserialize, Serialize};

/// Label/value pair shown in descriptive metadata panels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub label: LanguageMap,
    pub value: LanguageMap,
}

/// Descriptive properties every kind carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LanguageMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LanguageMap>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,

    /// Absolute URI of a rights statement or license
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,

    /// RFC 3339 date-time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behavior: Vec<Behavior>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewing_direction: Option<ViewingDirection>,
}

/// Canvas extent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Seconds, for time-based media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            duration: None,
        }
    }
}
