//! Live ingestion into the local index.
//!
//! `bsc ingest <channel>` reads newline-delimited JSON from a file or stdin
//! and appends every message to its channel/month partition. Two line shapes
//! are accepted:
//!
//! | Shape | Key fields |
//! |-------|------------|
//! | REST message | `id`, `author`, `content`, `timestamp` (RFC 3339) |
//! | index line | `id`, `author`, `content`, `createdTimestamp` (ms) |
//!
//! Lines that match neither are reported and skipped; the rest of the input
//! is still ingested.

use std::path::Path;

use anyhow::{Context, Result};
use backscroll_core::index::RecordIndex;
use backscroll_core::models::{IndexedRecord, RemoteRecord};
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use crate::config::Config;
use crate::jsonl_index::{validate_channel_id, JsonlIndex};
use crate::remote_http::WireMessage;

#[derive(Deserialize)]
#[serde(untagged)]
enum IngestLine {
    Wire(WireMessage),
    Indexed(IndexedRecord),
}

/// Counts reported after an ingest run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub appended: usize,
    pub skipped: usize,
}

/// Decode one input line into a record.
pub fn parse_line(line: &str) -> Result<RemoteRecord> {
    let parsed: IngestLine = serde_json::from_str(line)
        .with_context(|| "not a message object (need timestamp or createdTimestamp)")?;
    match parsed {
        IngestLine::Wire(m) => m.into_record(),
        IngestLine::Indexed(r) => Ok(RemoteRecord::try_from(r)?),
    }
}

/// Append every decodable line of `input` to `index`.
pub async fn ingest_lines(
    index: &dyn RecordIndex,
    channel_id: &str,
    input: &str,
) -> Result<IngestStats> {
    validate_channel_id(channel_id)?;
    let mut stats = IngestStats::default();
    for (n, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = match parse_line(line) {
            Ok(r) => r,
            Err(e) => {
                warn!(line = n + 1, error = %format!("{:#}", e), "skipping input line");
                stats.skipped += 1;
                continue;
            }
        };
        index
            .append(channel_id, &record)
            .await
            .with_context(|| format!("Failed to index line {}", n + 1))?;
        stats.appended += 1;
    }
    Ok(stats)
}

/// Run `bsc ingest`.
pub async fn run_ingest(config: &Config, channel_id: &str, file: Option<&Path>) -> Result<()> {
    let input = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .with_context(|| "Failed to read stdin")?;
            buf
        }
    };

    let index = JsonlIndex::new(&config.index.root);
    let stats = ingest_lines(&index, channel_id, &input).await?;
    info!(
        channel = channel_id,
        appended = stats.appended,
        skipped = stats.skipped,
        "ingest finished"
    );

    println!("Ingested {} records into {}", stats.appended, channel_id);
    if stats.skipped > 0 {
        println!("  skipped: {} malformed lines", stats.skipped);
    }
    Ok(())
}
