use super::documents::{find_documents, load_document};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use folio_validator::{validate_document, Issue, Severity, Summary, ValidateOptions};
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Input .json document or directory of documents
    pub input: PathBuf,

    /// Show warnings as well as errors
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub fn validate(args: ValidateArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let files = find_documents(&args.input)?;
    let json_output = args.format == "json";

    if !json_output {
        println!("🔍 {} Folio validator", "Starting".green().bold());
        println!("   Input: {}", args.input.display());
        println!("   Found {} documents", files.len());
        println!();
    }

    let mut total = Summary::default();
    let mut unreadable = 0;
    let mut reports = Vec::new();

    for file in &files {
        let issues = match check_file(file) {
            Ok(issues) => issues,
            Err(err) => {
                eprintln!("{} {}: {:#}", "✗".red(), file.display(), err);
                unreadable += 1;
                continue;
            }
        };

        let summary = Summary::of(&issues);
        total.errors += summary.errors;
        total.warnings += summary.warnings;
        total.fixable += summary.fixable;

        if json_output {
            reports.push(json!({
                "file": file.display().to_string(),
                "summary": summary,
                "issues": issues,
            }));
        } else {
            print_issues(file, &issues, args.verbose);
        }
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!(
            "✨ {} Validation complete!",
            if total.errors + unreadable > 0 {
                "Done".red().bold()
            } else {
                "Done".green().bold()
            }
        );
        println!("   Documents checked: {}", files.len());
        if total.errors > 0 {
            println!("   {} {}", "Errors:".red(), total.errors);
        }
        if total.warnings > 0 {
            println!("   {} {}", "Warnings:".yellow(), total.warnings);
        }
        if total.fixable > 0 {
            println!("   {} {} (run `folio heal`)", "Fixable:".cyan(), total.fixable);
        }
        if total.is_clean() && unreadable == 0 {
            println!("   {} No issues found!", "✓".green());
        }
    }

    let failed_on_warnings = config.fail_on_warnings && total.warnings > 0;
    if total.errors > 0 || unreadable > 0 || failed_on_warnings {
        return Err(anyhow!(
            "Validation failed: {} errors, {} warnings, {} unreadable documents",
            total.errors,
            total.warnings,
            unreadable
        ));
    }
    Ok(())
}

fn check_file(path: &Path) -> Result<Vec<Issue>> {
    let document = load_document(path)?;
    Ok(validate_document(&document, ValidateOptions::default()))
}

fn print_issues(file: &Path, issues: &[Issue], verbose: bool) {
    let shown: Vec<&Issue> = issues
        .iter()
        .filter(|issue| verbose || issue.severity == Severity::Error)
        .collect();

    if shown.is_empty() {
        println!("{} {}", "✓".green(), file.display());
        return;
    }

    println!("{}", file.display());
    for issue in shown {
        let level = match issue.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        println!("  {} [{:?}] {}", level, issue.category, issue.message);
        println!("    {} {}", "at".dimmed(), issue.entity_id.dimmed());
        if issue.fixable {
            println!("    {} fixable with `folio heal`", "💡".dimmed());
        }
    }
    println!();
}
