use anyhow::{Context, Result};
use backscroll_core::civil::CivilZone;
use backscroll_core::retrieve::RetrievalParams;
use backscroll_core::store::MAX_BATCH;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub timezone: TimezoneConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_root")]
    pub root: PathBuf,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub backfill: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_index_root(),
            enabled: true,
            backfill: true,
        }
    }
}

fn default_index_root() -> PathBuf {
    PathBuf::from("./data/index")
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}
fn default_token_env() -> String {
    "BACKSCROLL_TOKEN".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_size")]
    pub anchor_batch_size: usize,
    #[serde(default = "default_anchor_retries")]
    pub anchor_retries: u32,
    #[serde(default = "default_widen_days")]
    pub widen_days: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            batch_size: default_batch_size(),
            anchor_batch_size: default_batch_size(),
            anchor_retries: default_anchor_retries(),
            widen_days: default_widen_days(),
        }
    }
}

fn default_max_records() -> usize {
    500
}
fn default_batch_size() -> usize {
    100
}
fn default_anchor_retries() -> u32 {
    2
}
fn default_widen_days() -> i64 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimezoneConfig {
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_true")]
    pub daylight_saving: bool,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
            daylight_saving: true,
        }
    }
}

fn default_utc_offset_minutes() -> i32 {
    -300
}

impl Config {
    /// Defaults for commands that can run without a config file.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn zone(&self) -> CivilZone {
        CivilZone::new(
            self.timezone.utc_offset_minutes,
            self.timezone.daylight_saving,
        )
    }

    pub fn retrieval_params(&self) -> RetrievalParams {
        RetrievalParams {
            max_records: self.retrieval.max_records,
            batch_size: self.retrieval.batch_size,
            anchor_batch_size: self.retrieval.anchor_batch_size,
            anchor_retries: self.retrieval.anchor_retries,
            widen: chrono::Duration::days(self.retrieval.widen_days),
            use_index: self.index.enabled,
            backfill: self.index.backfill,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.remote.base_url.trim().is_empty() {
        anyhow::bail!("remote.base_url must not be empty");
    }
    if config.remote.timeout_secs == 0 {
        anyhow::bail!("remote.timeout_secs must be > 0");
    }

    let r = &config.retrieval;
    if r.max_records < 1 {
        anyhow::bail!("retrieval.max_records must be >= 1");
    }
    if !(1..=MAX_BATCH).contains(&r.batch_size) {
        anyhow::bail!("retrieval.batch_size must be in 1..={}", MAX_BATCH);
    }
    if !(1..=MAX_BATCH).contains(&r.anchor_batch_size) {
        anyhow::bail!("retrieval.anchor_batch_size must be in 1..={}", MAX_BATCH);
    }
    if r.anchor_retries > 10 {
        anyhow::bail!("retrieval.anchor_retries must be <= 10");
    }
    if r.widen_days < 0 {
        anyhow::bail!("retrieval.widen_days must be >= 0");
    }

    if config.timezone.utc_offset_minutes.abs() > 14 * 60 {
        anyhow::bail!(
            "timezone.utc_offset_minutes must be within ±{} (got {})",
            14 * 60,
            config.timezone.utc_offset_minutes
        );
    }

    Ok(())
}
