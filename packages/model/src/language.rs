use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Localized string: locale code → ordered variants.
///
/// An entry with zero variants is legal but renders as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageMap(pub BTreeMap<String, Vec<String>>);

impl LanguageMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Single-variant map for one locale
    pub fn single(locale: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(locale.into(), vec![value.into()]);
        Self(map)
    }

    pub fn get(&self, locale: &str) -> Option<&[String]> {
        self.0.get(locale).map(|v| v.as_slice())
    }

    /// First non-empty variant, preferring `locale`, then `none`, then any.
    pub fn first_value(&self, locale: &str) -> Option<&str> {
        let pick = |key: &str| {
            self.0
                .get(key)
                .and_then(|values| values.iter().find(|v| !v.is_empty()))
                .map(|v| v.as_str())
        };

        pick(locale)
            .or_else(|| pick("none"))
            .or_else(|| self.0.keys().find_map(|k| pick(k)))
    }

    /// True when no locale carries a non-empty variant
    pub fn is_blank(&self) -> bool {
        self.0.values().all(|values| values.iter().all(|v| v.trim().is_empty()))
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
}
