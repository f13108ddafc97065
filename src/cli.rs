//! Command-line interface
//!
//! `prodigio list` shows the shipped optimizers, `prodigio presets` prints
//! the preset tables, and `prodigio history` inspects or trims the usage
//! history files.

use std::path::PathBuf;

use chrono::Duration;
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::{ConfigError, PresetStore};
use crate::history::{HistoryBackend, HistoryError, JsonFileHistory};
use crate::registry::OptimizerRegistry;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Preset and history manager for the prodigio optimizers
#[derive(Parser)]
#[command(name = "prodigio", version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available optimizers
    List,
    /// Show the preset table for an optimizer
    Presets {
        /// Optimizer id
        optimizer: String,
        /// Show only this preset label
        #[arg(long)]
        label: Option<String>,
    },
    /// Inspect or trim the usage history
    History {
        /// Optimizer id
        optimizer: String,
        /// Directory holding the history files
        #[arg(long, default_value = "history")]
        dir: PathBuf,
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print recorded entries
    Show {
        /// Only entries newer than this many days
        #[arg(long)]
        ttl_days: Option<i64>,
    },
    /// Remove all recorded entries
    Clear,
    /// Drop entries older than the TTL and rewrite the file
    Prune {
        #[arg(long, default_value_t = 30)]
        ttl_days: i64,
    },
}

/// Execute a parsed CLI invocation
pub fn run_command(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let registry = OptimizerRegistry::builtin();
            println!("standard optimizers:");
            for id in registry.standard_ids() {
                println!("- {id}");
            }
            println!("enhanced variants:");
            for name in registry.enhanced_names() {
                println!("- {name}");
            }
            Ok(())
        }
        Command::Presets { optimizer, label } => {
            let store = PresetStore::builtin();
            match label {
                Some(label) => {
                    let preset = store.lookup(&optimizer, &label)?;
                    println!("{}", serde_json::to_string_pretty(preset)?);
                }
                None => {
                    let table = store.table(&optimizer)?;
                    println!("{}", serde_json::to_string_pretty(table)?);
                }
            }
            Ok(())
        }
        Command::History { optimizer, dir, action } => {
            let backend = JsonFileHistory::new(dir)?;
            match action {
                HistoryAction::Show { ttl_days } => {
                    let mut entries = backend.load(&optimizer)?;
                    if let Some(days) = ttl_days {
                        let cutoff = chrono::Utc::now() - Duration::days(days);
                        entries.retain(|e| e.timestamp >= cutoff);
                    }
                    if entries.is_empty() {
                        println!("no history for '{optimizer}'");
                    } else {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                }
                HistoryAction::Clear => {
                    backend.clear(&optimizer)?;
                    println!("history cleared for '{optimizer}'");
                }
                HistoryAction::Prune { ttl_days } => {
                    let removed =
                        backend.prune_older_than(&optimizer, Duration::days(ttl_days))?;
                    println!("pruned {removed} entries for '{optimizer}'");
                }
            }
            Ok(())
        }
    }
}
