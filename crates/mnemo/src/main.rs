// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mnemo - semantic memory and retrieval engine.
//!
//! This is the binary entry point. Every command prints JSON to stdout.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use mnemo_config::model::MnemoConfig;
use mnemo_context::{ContextOptions, Role};
use mnemo_core::MnemoError;
use mnemo_knowledge::{DocType, NewDocument, SearchOptions};
use mnemo_memory::{RecallOptions, StoreOptions};
use serde::Serialize;

use crate::app::App;

/// Mnemo - semantic memory and retrieval engine.
#[derive(Parser, Debug)]
#[command(name = "mnemo", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a text file into an owner's knowledge base.
    Ingest {
        file: PathBuf,
        #[arg(long)]
        owner: String,
        /// Display name; defaults to the file name.
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type", default_value = "document")]
        doc_type: String,
    },
    /// Semantic search over an owner's ready documents.
    Search {
        query: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Store a memory.
    Remember {
        #[arg(long)]
        owner: String,
        key: String,
        value: String,
        #[arg(long, default_value_t = 5)]
        importance: u8,
    },
    /// Recall memories relevant to a query.
    Recall {
        #[arg(long)]
        owner: String,
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Append a message to a conversation.
    Say {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        session: String,
        #[arg(long, default_value = "user")]
        role: String,
        content: String,
    },
    /// Show the assembled context of a conversation.
    Context {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        session: String,
        /// Skip memory recall.
        #[arg(long)]
        fast: bool,
    },
    /// End a conversation, extracting memorable facts.
    End {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        session: String,
    },
    /// Knowledge and memory statistics for an owner.
    Stats {
        #[arg(long)]
        owner: String,
    },
    /// Delete expired memories.
    Sweep,
    /// Print the effective, validated configuration.
    Config,
}

#[derive(Serialize)]
struct Stats {
    knowledge: mnemo_knowledge::KnowledgeStats,
    memory: mnemo_memory::MemoryStats,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => mnemo_config::load_and_validate_path(path),
        None => mnemo_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            mnemo_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("mnemo: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &MnemoConfig) -> Result<(), MnemoError> {
    if let Commands::Config = command {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| MnemoError::Internal(format!("failed to render config: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    let app = App::open(config).await?;
    let result = execute(&app, command).await;
    app.shutdown().await;
    result
}

async fn execute(app: &App, command: Commands) -> Result<(), MnemoError> {
    match command {
        Commands::Ingest {
            file,
            owner,
            name,
            doc_type,
        } => {
            let doc_type = parse_arg::<DocType>("type", &doc_type)?;
            let text = tokio::fs::read_to_string(&file)
                .await
                .map_err(|e| MnemoError::Validation(format!("cannot read {}: {e}", file.display())))?;
            let name = name.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string())
            });
            let receipt = app
                .knowledge
                .ingest_knowledge(&owner, NewDocument::new(name, doc_type, text))
                .await?;
            print_json(&receipt)
        }
        Commands::Search {
            query,
            owner,
            limit,
            threshold,
        } => {
            let hits = app
                .knowledge
                .search_knowledge(&owner, &query, SearchOptions { limit, threshold })
                .await?;
            print_json(&hits)
        }
        Commands::Remember {
            owner,
            key,
            value,
            importance,
        } => {
            let options = StoreOptions {
                importance,
                ..StoreOptions::default()
            };
            let stored = app.memory.store_memory(&owner, &key, &value, options).await?;
            print_json(&stored)
        }
        Commands::Recall {
            owner,
            query,
            limit,
        } => {
            let options = RecallOptions {
                limit,
                ..RecallOptions::default()
            };
            let recall = app.memory.recall_memory(&owner, &query, options).await?;
            print_json(&recall)
        }
        Commands::Say {
            owner,
            session,
            role,
            content,
        } => {
            let role = parse_arg::<Role>("role", &role)?;
            let message = app
                .conversations
                .add_message(&owner, &session, role, &content, None)
                .await?;
            print_json(&message)
        }
        Commands::Context {
            owner,
            session,
            fast,
        } => {
            let options = ContextOptions {
                skip_memory_recall: fast,
            };
            let context = app
                .conversations
                .get_context(&session, &owner, options)
                .await?;
            print_json(&context)
        }
        Commands::End { owner, session } => {
            let report = app.conversations.end_conversation(&owner, &session).await?;
            print_json(&report)
        }
        Commands::Stats { owner } => {
            let stats = Stats {
                knowledge: app.knowledge.knowledge_stats(&owner).await?,
                memory: app.memory.memory_stats(&owner).await?,
            };
            print_json(&stats)
        }
        Commands::Sweep => {
            let removed = app.memory.sweep_expired().await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
        Commands::Config => Ok(()),
    }
}

fn parse_arg<T: FromStr>(field: &str, value: &str) -> Result<T, MnemoError> {
    T::from_str(value).map_err(|_| MnemoError::Validation(format!("invalid {field}: `{value}`")))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), MnemoError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| MnemoError::Internal(format!("failed to render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mnemo={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_search() {
        let cli = Cli::try_parse_from([
            "mnemo", "search", "refund policy", "--owner", "alice", "--limit", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Search { query, owner, limit, threshold } => {
                assert_eq!(query, "refund policy");
                assert_eq!(owner, "alice");
                assert_eq!(limit, Some(3));
                assert_eq!(threshold, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_ingest_type() {
        let cli = Cli::try_parse_from([
            "mnemo", "ingest", "page.txt", "--owner", "alice", "--type", "website",
        ])
        .unwrap();
        let Commands::Ingest { doc_type, name, .. } = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(parse_arg::<DocType>("type", &doc_type).unwrap(), DocType::Website);
        assert!(name.is_none());
    }

    #[test]
    fn parse_arg_rejects_unknown_role() {
        let err = parse_arg::<Role>("role", "narrator").unwrap_err();
        assert!(matches!(err, MnemoError::Validation(_)));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = mnemo_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.context.window_messages, 20);
    }
}
