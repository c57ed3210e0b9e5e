use super::documents::{load_document, save_document};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use folio_validator::{fix_all, validate_document, Summary, ValidateOptions};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct HealArgs {
    /// Input .json document
    pub input: PathBuf,

    /// Where to write the healed document (defaults to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report what would be fixed without writing
    #[arg(long)]
    pub dry_run: bool,
}

pub fn heal(args: HealArgs, _cwd: &str) -> Result<()> {
    let mut document = load_document(&args.input)?;

    println!("🩹 {} {}", "Healing".green().bold(), args.input.display());

    let issues = validate_document(&document, ValidateOptions::default());
    let report = fix_all(&mut document, &issues);

    for issue in &report.fixed {
        println!("  {} {:?} on {}", "✓".green(), issue.code, issue.entity_id.dimmed());
    }
    for failure in &report.errors {
        println!(
            "  {} {:?} on {}: {}",
            "✗".red(),
            failure.issue.code,
            failure.issue.entity_id,
            failure.error
        );
    }

    let remaining = Summary::of(&validate_document(&document, ValidateOptions::default()));
    println!();
    println!("   Fixed: {}", report.fixed.len());
    if remaining.total() > 0 {
        println!(
            "   Remaining: {} errors, {} warnings (not automatically fixable)",
            remaining.errors, remaining.warnings
        );
    }

    if args.dry_run {
        println!("   {} nothing written", "Dry run:".yellow());
    } else if !report.fixed.is_empty() {
        let output = args.output.as_ref().unwrap_or(&args.input);
        save_document(output, &document)?;
        println!("   Written to {}", output.display());
    }

    if !report.is_success() {
        return Err(anyhow!("{} fixes could not be applied", report.errors.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::{Canvas, Manifest, Resource};
    use tempfile::TempDir;

    #[test]
    fn test_heal_writes_fixed_document() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("book.json");
        let output = dir.path().join("healed.json");
        let manifest = Manifest::new("https://example.org/iiif/book")
            .with_canvas(Canvas::new("https://example.org/iiif/book/p1", 0, 10));
        save_document(&input, &Resource::Manifest(manifest)).unwrap();

        let args = HealArgs {
            input: input.clone(),
            output: Some(output.clone()),
            dry_run: false,
        };
        heal(args, &dir.path().display().to_string()).unwrap();

        let healed = load_document(&output).unwrap();
        let issues = validate_document(&healed, ValidateOptions::default());
        assert!(issues.iter().all(|i| !i.fixable), "{:?}", issues);
        // Input left alone
        assert_ne!(load_document(&input).unwrap(), healed);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("book.json");
        let original = Resource::Manifest(Manifest::new("https://example.org/iiif/book"));
        save_document(&input, &original).unwrap();

        let args = HealArgs {
            input: input.clone(),
            output: None,
            dry_run: true,
        };
        heal(args, &dir.path().display().to_string()).unwrap();
        assert_eq!(load_document(&input).unwrap(), original);
    }
}
