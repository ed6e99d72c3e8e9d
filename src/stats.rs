//! Index statistics.
//!
//! Summarises what the local index holds: line counts and file sizes per
//! channel and month. Used by `bsc stats` to check that ingestion and
//! backfill are landing where expected.

use anyhow::Result;

use crate::config::Config;
use crate::jsonl_index::{JsonlIndex, PartitionStats};

/// Run the stats command: scan the index root and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let index = JsonlIndex::new(&config.index.root);
    let partitions = index.partitions().await?;

    let total_lines: usize = partitions.iter().map(|p| p.lines).sum();
    let total_bytes: u64 = partitions.iter().map(|p| p.bytes).sum();
    let channels = count_channels(&partitions);

    println!("Backscroll: Index Stats");
    println!("=======================");
    println!();
    println!("  Root:        {}", config.index.root.display());
    println!("  Channels:    {}", channels);
    println!("  Files:       {}", partitions.len());
    println!("  Records:     {}", total_lines);
    println!("  Size:        {}", format_bytes(total_bytes));

    if !partitions.is_empty() {
        println!();
        println!("  {:<24} {:>7} {:>9} {:>10}", "CHANNEL", "MONTH", "RECORDS", "SIZE");
        println!("  {}", "-".repeat(54));
        for p in &partitions {
            println!(
                "  {:<24} {:>4}-{:02} {:>9} {:>10}",
                p.channel_id,
                p.month.0,
                p.month.1,
                p.lines,
                format_bytes(p.bytes)
            );
        }
    }

    println!();
    Ok(())
}

fn count_channels(partitions: &[PartitionStats]) -> usize {
    let mut names: Vec<&str> = partitions.iter().map(|p| p.channel_id.as_str()).collect();
    names.dedup();
    names.len()
}

/// Format bytes as human-readable (e.g. "1.2 MB").
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
