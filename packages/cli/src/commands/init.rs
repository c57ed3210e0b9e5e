use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Locale used when printing labels
    #[arg(short, long, default_value = "none")]
    pub locale: String,

    /// Undo steps kept by `edit` (0 = unlimited)
    #[arg(long, default_value = "100")]
    pub history_capacity: usize,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = Config {
        history_capacity: args.history_capacity,
        default_locale: args.locale,
        ..Config::default()
    };

    let json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, json + "\n")?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(force: bool) -> InitArgs {
        InitArgs {
            locale: "en".to_string(),
            history_capacity: 10,
            force,
        }
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let cwd = dir.path().display().to_string();
        init(args(false), &cwd).unwrap();

        let config = Config::load(&cwd).unwrap();
        assert_eq!(config.default_locale, "en");
        assert_eq!(config.history_capacity, 10);
    }

    #[test]
    fn test_existing_config_is_kept_without_force() {
        let dir = TempDir::new().unwrap();
        let cwd = dir.path().display().to_string();
        fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{"defaultLocale": "fr"}"#).unwrap();

        init(args(false), &cwd).unwrap();
        assert_eq!(Config::load(&cwd).unwrap().default_locale, "fr");

        init(args(true), &cwd).unwrap();
        assert_eq!(Config::load(&cwd).unwrap().default_locale, "en");
    }
}
