use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

/// Folio configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Undo steps kept by `edit` (0 = unlimited)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Locale used when printing labels
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// Treat validation warnings as failures
    #[serde(default)]
    pub fail_on_warnings: bool,
}

fn default_history_capacity() -> usize {
    100
}

fn default_locale() -> String {
    "none".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            default_locale: default_locale(),
            fail_on_warnings: false,
        }
    }
}
