use super::documents::load_document;
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use folio_editor::{Selectors, TreeRow};
use folio_model::EntityKind;
use folio_store::normalize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Input .json document
    pub input: PathBuf,

    /// List only the subtree under this id
    #[arg(short, long)]
    pub root: Option<String>,

    /// Locale for labels (overrides config)
    #[arg(short, long)]
    pub locale: Option<String>,

    /// Stop below this depth
    #[arg(short, long)]
    pub depth: Option<usize>,
}

pub fn tree(args: TreeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let document = load_document(&args.input)?;
    let state = Arc::new(normalize(&document)?);

    let locale = args.locale.unwrap_or(config.default_locale);
    let selectors = Selectors::new(locale);

    let root = match &args.root {
        Some(id) if state.contains(id) => id.clone(),
        Some(id) => return Err(anyhow!("No entity with id {}", id)),
        None => document.id().to_string(),
    };

    for line in render(&selectors.subtree(&state, &root), args.depth) {
        println!("{}", line);
    }
    Ok(())
}

fn render(rows: &[TreeRow], max_depth: Option<usize>) -> Vec<String> {
    rows.iter()
        .filter(|row| max_depth.map_or(true, |max| row.depth <= max))
        .map(|row| {
            let kind = match row.kind {
                EntityKind::Collection => row.kind.as_str().magenta(),
                EntityKind::Manifest => row.kind.as_str().blue(),
                EntityKind::Canvas => row.kind.as_str().green(),
                EntityKind::Range => row.kind.as_str().cyan(),
                EntityKind::AnnotationPage | EntityKind::Annotation => row.kind.as_str().dimmed(),
            };
            let label = row.label.as_deref().unwrap_or("(no label)");
            format!("{}{} {} {}", "  ".repeat(row.depth), kind, label, row.id.dimmed())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, kind: EntityKind, depth: usize, label: Option<&str>) -> TreeRow {
        TreeRow {
            id: id.to_string(),
            kind,
            depth,
            label: label.map(str::to_string),
        }
    }

    #[test]
    fn test_render_indents_and_cuts_depth() {
        colored::control::set_override(false);
        let rows = vec![
            row("m1", EntityKind::Manifest, 0, Some("Letters")),
            row("c1", EntityKind::Canvas, 1, None),
            row("c1/p", EntityKind::AnnotationPage, 2, None),
        ];

        let lines = render(&rows, Some(1));
        assert_eq!(lines, vec!["Manifest Letters m1", "  Canvas (no label) c1"]);
    }
}
