//! # Backscroll CLI (`bsc`)
//!
//! Resolve range tokens, feed and inspect the local index, and run full
//! time-windowed retrievals against the remote API.
//!
//! ## Usage
//!
//! ```bash
//! bsc --config ./config/bsc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bsc window "<text>"` | Print the UTC window for the range token in `text` |
//! | `bsc ingest <channel>` | Append NDJSON messages from stdin or `--file` to the index |
//! | `bsc query <channel> "<text>"` | Read a window from the local index only |
//! | `bsc fetch <channel> "<text>"` | Index first, then anchored remote walk, then linear fallback |
//! | `bsc stats` | Per-channel, per-month index summary |
//!
//! Logs go to stderr and honour `RUST_LOG` (default `info`).

use anyhow::Context;
use backscroll::config;
use backscroll::fetch::{self, FetchOptions};
use backscroll::{ingest, stats};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Backscroll CLI: time-windowed chat history retrieval with a local index.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/bsc.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "bsc",
    about = "Backscroll: time-windowed chat history retrieval with a local index",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/bsc.toml`. `window` and `stats` fall back to
    /// built-in defaults when the file does not exist.
    #[arg(long, global = true, default_value = "./config/bsc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the `{date}` or `{date - date}` token in a piece of text.
    Window {
        /// Free text containing a range token.
        text: String,

        /// Evaluate `Today` at this instant (RFC 3339) instead of now.
        #[arg(long)]
        now: Option<String>,
    },

    /// Append newline-delimited JSON messages to the local index.
    ///
    /// Accepts REST message objects (`timestamp`) or index lines
    /// (`createdTimestamp`). Malformed lines are skipped.
    Ingest {
        /// Channel to file the messages under.
        channel: String,

        /// Read from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Read a window from the local index only. Makes no remote calls.
    Query {
        channel: String,
        /// Free text containing a range token.
        text: String,
    },

    /// Retrieve a window: local index, then remote with fallback.
    Fetch {
        channel: String,
        /// Free text containing a range token.
        text: String,

        /// Maximum records to return (defaults to `retrieval.max_records`).
        #[arg(long)]
        max: Option<usize>,

        /// Skip the local index lookup. Results are not backfilled either.
        #[arg(long)]
        no_index: bool,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show what the local index holds.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Window { text, now } => {
            let cfg = config::load_or_minimal(&cli.config)?;
            let now = match now {
                Some(s) => DateTime::parse_from_rfc3339(&s)
                    .with_context(|| format!("Invalid --now value: {}", s))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            fetch::run_window(&cfg, &text, now)?;
        }
        Commands::Stats => {
            let cfg = config::load_or_minimal(&cli.config)?;
            stats::run_stats(&cfg).await?;
        }
        Commands::Ingest { channel, file } => {
            let cfg = config::load_config(&cli.config)?;
            ingest::run_ingest(&cfg, &channel, file.as_deref()).await?;
        }
        Commands::Query { channel, text } => {
            let cfg = config::load_config(&cli.config)?;
            fetch::run_query(&cfg, &channel, &text).await?;
        }
        Commands::Fetch {
            channel,
            text,
            max,
            no_index,
            json,
        } => {
            let cfg = config::load_config(&cli.config)?;
            let opts = FetchOptions {
                max,
                no_index,
                json,
            };
            fetch::run_fetch(&cfg, &channel, &text, &opts).await?;
        }
    }

    Ok(())
}
