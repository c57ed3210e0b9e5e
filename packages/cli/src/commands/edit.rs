use super::documents::{load_document, save_document};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use folio_editor::Dispatcher;
use folio_store::denormalize;
use serde_json::Value;
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Input .json document
    pub input: PathBuf,

    /// JSON file with one action or an array of actions
    #[arg(short, long)]
    pub actions: PathBuf,

    /// Where to write the edited document (defaults to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Undo this many steps after applying the actions
    #[arg(long, default_value = "0")]
    pub undo: usize,

    /// Print the audit trail of every applied action
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn edit(args: EditArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let document = load_document(&args.input)?;
    let actions = load_actions(&args.actions)?;

    let mut editor = Dispatcher::from_document(&document, config.history_capacity)?;
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    editor.subscribe_errors(move |error, _| sink.borrow_mut().push(error.to_string()));

    println!("✏️  {} {} ({} actions)", "Editing".green().bold(), args.input.display(), actions.len());

    let mut rejected = 0;
    for (n, action) in actions.iter().enumerate() {
        let tag = action.get("type").and_then(Value::as_str).unwrap_or("?");
        let before = Arc::clone(editor.state());
        let committed = editor.dispatch_value(action);
        let partial = !committed && !Arc::ptr_eq(&before, editor.state());

        if committed || partial {
            if committed {
                println!("  {} {} {}", "✓".green(), n + 1, tag);
            } else {
                rejected += 1;
                println!("  {} {} {} (partially applied)", "~".yellow(), n + 1, tag);
            }
            if args.verbose {
                for change in editor.last_changes() {
                    println!(
                        "      {} {}: {} → {}",
                        change.entity_id.dimmed(),
                        change.property,
                        change.old_value,
                        change.new_value
                    );
                }
            }
        } else {
            rejected += 1;
            println!("  {} {} {}", "✗".red(), n + 1, tag);
        }
        for message in errors.borrow_mut().drain(..) {
            println!("      {}", message.red());
        }
    }

    for _ in 0..args.undo {
        if !editor.undo() {
            println!("  {} nothing left to undo", "⚠️".yellow());
            break;
        }
    }

    let edited = denormalize(editor.state())?;
    let output = args.output.as_ref().unwrap_or(&args.input);
    save_document(output, &edited)?;

    println!();
    println!("   Applied: {}", actions.len() - rejected);
    if rejected > 0 {
        println!("   {} {}", "Rejected:".red(), rejected);
    }
    println!("   Written to {}", output.display());

    if rejected > 0 {
        return Err(anyhow!("{} of {} actions were rejected", rejected, actions.len()));
    }
    Ok(())
}

fn load_actions(path: &PathBuf) -> Result<Vec<Value>> {
    let source = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let value: Value = serde_json::from_str(&source).with_context(|| format!("Cannot parse {}", path.display()))?;
    Ok(match value {
        Value::Array(actions) => actions,
        single => vec![single],
    })
}
