//! `window`, `query` and `fetch` commands.
//!
//! All three start by pulling a `{date}` / `{date - date}` token out of free
//! text and resolving it in the configured civil zone. `query` then reads the
//! local index only; `fetch` runs the full [`Retriever`] (index first, then
//! the remote strategies).
//!
//! Records go to stdout; diagnostics go to stderr so output can be piped.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use backscroll_core::civil::CivilZone;
use backscroll_core::index::RecordIndex;
use backscroll_core::models::{RemoteRecord, RetrievalResult, TimeWindow};
use backscroll_core::range::RangeParser;
use backscroll_core::retrieve::Retriever;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::jsonl_index::{validate_channel_id, JsonlIndex};
use crate::remote_http::HttpRemoteStore;

/// Options for `bsc fetch`.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub max: Option<usize>,
    pub no_index: bool,
    pub json: bool,
}

/// Resolve the range token in `text`, or fail with "no window".
pub fn resolve_window(config: &Config, text: &str, now: DateTime<Utc>) -> Result<TimeWindow> {
    let parser = RangeParser::new(config.zone());
    parser
        .try_parse(text, now)
        .map_err(|e| anyhow!("no time window could be parsed from {:?}: {}", text, e))
}

/// Run `bsc window`: print the resolved UTC interval.
pub fn run_window(config: &Config, text: &str, now: DateTime<Utc>) -> Result<()> {
    let window = resolve_window(config, text, now)?;
    println!("start: {}", window.start().format("%Y-%m-%dT%H:%M:%S%.3fZ"));
    println!("end:   {}", window.end().format("%Y-%m-%dT%H:%M:%S%.3fZ"));
    Ok(())
}

/// Run `bsc query`: index-only lookup.
pub async fn run_query(config: &Config, channel_id: &str, text: &str) -> Result<()> {
    validate_channel_id(channel_id)?;
    let window = resolve_window(config, text, Utc::now())?;
    let index = JsonlIndex::new(&config.index.root);
    let rows = index.query_range(channel_id, &window).await?;

    let zone = config.zone();
    let mut seen = std::collections::HashSet::new();
    let mut shown = 0;
    for row in rows {
        if !seen.insert(row.id.clone()) {
            continue;
        }
        let record = RemoteRecord::try_from(row)?;
        println!("{}", format_record(&record, zone));
        shown += 1;
    }
    eprintln!("{} records in {}", shown, window);
    Ok(())
}

/// Run `bsc fetch`: orchestrated retrieval.
pub async fn run_fetch(
    config: &Config,
    channel_id: &str,
    text: &str,
    opts: &FetchOptions,
) -> Result<()> {
    validate_channel_id(channel_id)?;
    let window = resolve_window(config, text, Utc::now())?;

    let mut params = config.retrieval_params();
    if opts.no_index {
        params.use_index = false;
    }
    let max = opts.max.unwrap_or(params.max_records);
    if max == 0 {
        bail!("--max must be >= 1");
    }

    let store = Arc::new(HttpRemoteStore::from_config(&config.remote)?);
    let mut retriever = Retriever::new(store, params);
    if config.index.enabled {
        retriever = retriever.with_index(Arc::new(JsonlIndex::new(&config.index.root)));
    }

    let result = retriever.retrieve(channel_id, &window, max).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for r in &result.records {
            println!("{}", format_record(r, config.zone()));
        }
    }
    eprintln!("{}", summary(&window, &result));
    Ok(())
}

/// `[2024-01-10 07:00:00] ada: hello`, in local civil time.
pub fn format_record(record: &RemoteRecord, zone: CivilZone) -> String {
    format!(
        "[{}] {}: {}",
        zone.from_utc(record.created_at).format("%Y-%m-%d %H:%M:%S"),
        record.author.username,
        record.content
    )
}

fn summary(window: &TimeWindow, result: &RetrievalResult) -> String {
    let mut s = format!(
        "{} records in {} via {} ({} calls, {} ms)",
        result.records.len(),
        window,
        result.strategy,
        result.call_count,
        result.elapsed_ms
    );
    if let (true, Some(b)) = (result.truncated, result.boundary_timestamp) {
        s.push_str(&format!("; truncated at {}", b.format("%Y-%m-%dT%H:%M:%S%.3fZ")));
    }
    s
}
