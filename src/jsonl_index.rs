//! Append-only JSONL implementation of [`RecordIndex`].
//!
//! One file per channel and calendar month (UTC):
//!
//! ```text
//! {root}/
//!   {channel_id}/
//!     2024/
//!       01.jsonl
//!       02.jsonl
//! ```
//!
//! Each line is one [`IndexedRecord`]. Lines are never rewritten. Appends to
//! the same file are serialized through a per-file async mutex so two writers
//! cannot interleave partial lines; appends to different files proceed
//! independently. Readers take no lock and see whatever lines are complete.
//!
//! A missing month file means "no records". Unreadable files and lines that
//! do not parse (for example a line cut short by a crash, even mid-character)
//! are skipped with a warning.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use backscroll_core::index::{filter_window, month_of, months_overlapping, MonthKey, RecordIndex};
use backscroll_core::models::{IndexedRecord, RemoteRecord, TimeWindow};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Per-month file statistics, as reported by `bsc stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionStats {
    pub channel_id: String,
    pub month: MonthKey,
    pub lines: usize,
    pub bytes: u64,
}

pub struct JsonlIndex {
    root: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

/// Channel IDs become directory names, so only a safe alphabet is allowed.
pub fn validate_channel_id(channel_id: &str) -> Result<()> {
    if channel_id.is_empty() {
        bail!("channel id must not be empty");
    }
    if !channel_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        bail!(
            "invalid channel id {:?}: only ASCII letters, digits, '_' and '-' are allowed",
            channel_id
        );
    }
    Ok(())
}

impl JsonlIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{channel}/{year}/{month:02}.jsonl`
    pub fn partition_path(&self, channel_id: &str, (year, month): MonthKey) -> Result<PathBuf> {
        validate_channel_id(channel_id)?;
        Ok(self
            .root
            .join(channel_id)
            .join(format!("{:04}", year))
            .join(format!("{:02}.jsonl", month)))
    }

    /// Lock for one partition file. Entries nobody else holds are dropped
    /// on the way, so the table only tracks files with appends in flight.
    fn file_lock(&self, path: &Path) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| anyhow!("index lock table poisoned"))?;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(locks.entry(path.to_path_buf()).or_default().clone())
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map_or(0, |l| l.len())
    }

    async fn read_partition(&self, path: &Path) -> Vec<IndexedRecord> {
        let content = match tokio::fs::read(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable index file");
                return Vec::new();
            }
        };

        // Parsed line by line as bytes, so a line cut inside a multi-byte
        // character costs only that line.
        let mut rows = Vec::new();
        for (n, line) in content.split(|b| *b == b'\n').enumerate() {
            if is_blank(line) {
                continue;
            }
            match serde_json::from_slice::<IndexedRecord>(line) {
                Ok(r) => rows.push(r),
                Err(e) => warn!(
                    path = %path.display(),
                    line = n + 1,
                    error = %e,
                    "skipping corrupt index line"
                ),
            }
        }
        rows
    }

    /// Line and byte counts for every partition under the root, sorted by
    /// channel then month. An absent root yields an empty list.
    pub async fn partitions(&self) -> Result<Vec<PartitionStats>> {
        let mut stats = Vec::new();
        for channel_dir in list_dir(&self.root).await? {
            let Some(channel_id) = file_name(&channel_dir) else {
                continue;
            };
            if validate_channel_id(&channel_id).is_err() {
                continue;
            }
            for year_dir in list_dir(&channel_dir).await? {
                let Some(year) = file_name(&year_dir).and_then(|y| y.parse::<i32>().ok()) else {
                    continue;
                };
                for file in list_dir(&year_dir).await? {
                    let Some(month) = file_name(&file)
                        .and_then(|f| f.strip_suffix(".jsonl").map(str::to_string))
                        .and_then(|m| m.parse::<u32>().ok())
                    else {
                        continue;
                    };
                    let content = tokio::fs::read(&file)
                        .await
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    stats.push(PartitionStats {
                        channel_id: channel_id.clone(),
                        month: (year, month),
                        lines: content.split(|b| *b == b'\n').filter(|l| !is_blank(l)).count(),
                        bytes: content.len() as u64,
                    });
                }
            }
        }
        stats.sort_by(|a, b| (&a.channel_id, a.month).cmp(&(&b.channel_id, b.month)));
        Ok(stats)
    }
}

async fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("Failed to list {}", dir.display())),
    };
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}

#[async_trait]
impl RecordIndex for JsonlIndex {
    async fn append(&self, channel_id: &str, record: &RemoteRecord) -> Result<()> {
        let path = self.partition_path(channel_id, month_of(record))?;
        let mut line = serde_json::to_string(&IndexedRecord::from(record))?;
        line.push('\n');

        let lock = self.file_lock(&path)?;
        let _guard = lock.lock().await;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("Failed to append to {}", path.display()))?;
        file.flush().await?;

        debug!(channel = channel_id, id = %record.id, path = %path.display(), "indexed record");
        Ok(())
    }

    async fn query_range(
        &self,
        channel_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<IndexedRecord>> {
        validate_channel_id(channel_id)?;
        let mut rows = Vec::new();
        for month in months_overlapping(window) {
            let path = self.partition_path(channel_id, month)?;
            rows.extend(self.read_partition(&path).await);
        }
        Ok(filter_window(rows, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backscroll_core::store::memory::synthetic_record;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_partition_path_layout() {
        let index = JsonlIndex::new("/data");
        let p = index.partition_path("general-1", (2024, 3)).unwrap();
        assert_eq!(p, PathBuf::from("/data/general-1/2024/03.jsonl"));
    }

    #[test]
    fn test_channel_id_validation() {
        assert!(validate_channel_id("123456789").is_ok());
        assert!(validate_channel_id("dev_chat-2").is_ok());
        assert!(validate_channel_id("").is_err());
        assert!(validate_channel_id("../etc").is_err());
        assert!(validate_channel_id("a/b").is_err());
    }

    #[tokio::test]
    async fn test_append_writes_one_line_per_record() {
        let tmp = TempDir::new().unwrap();
        let index = JsonlIndex::new(tmp.path());
        let r = synthetic_record(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(), 0, "ada");
        index.append("c1", &r).await.unwrap();
        index.append("c1", &r).await.unwrap();

        let path = tmp.path().join("c1/2024/02.jsonl");
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"createdTimestamp\":"));
    }

    #[tokio::test]
    async fn test_lock_table_does_not_grow_with_partitions() {
        let tmp = TempDir::new().unwrap();
        let index = JsonlIndex::new(tmp.path());
        for month in 1..=12 {
            let r = synthetic_record(Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap(), 0, "ada");
            index.append("c1", &r).await.unwrap();
        }
        assert_eq!(index.tracked_locks(), 1);
    }

    #[tokio::test]
    async fn test_append_rejects_bad_channel() {
        let tmp = TempDir::new().unwrap();
        let index = JsonlIndex::new(tmp.path());
        let r = synthetic_record(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(), 0, "ada");
        assert!(index.append("../escape", &r).await.is_err());
    }
}
