//! HTTP implementation of [`RemoteStore`].
//!
//! Talks to a Discord-compatible REST endpoint:
//!
//! ```text
//! GET {base_url}/channels/{channel_id}/messages?limit=N&before=ID
//! GET {base_url}/channels/{channel_id}/messages?limit=N&after=ID
//! GET {base_url}/channels/{channel_id}/messages?limit=N&around=ID
//! Authorization: Bot <token>
//! ```
//!
//! The body is a JSON array of messages. Only `id`, `author.id`,
//! `author.username`, `content` and `timestamp` are read; other fields are
//! ignored. Any non-2xx status is an error. There is no retry here: the
//! retriever switches strategy on failure instead.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use backscroll_core::models::{Author, RemoteRecord};
use backscroll_core::store::{RemoteStore, MAX_BATCH};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::RemoteConfig;

/// A message as the REST API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub id: String,
    pub author: Author,
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
}

impl WireMessage {
    pub fn into_record(self) -> Result<RemoteRecord> {
        let created_at = DateTime::parse_from_rfc3339(&self.timestamp)
            .with_context(|| format!("message {} has invalid timestamp {:?}", self.id, self.timestamp))?
            .with_timezone(&Utc);
        Ok(RemoteRecord {
            id: self.id,
            author: self.author,
            content: self.content,
            created_at,
        })
    }
}

/// Parse a response body into records, in the order given.
pub fn parse_messages(body: &str) -> Result<Vec<RemoteRecord>> {
    let messages: Vec<WireMessage> =
        serde_json::from_str(body).with_context(|| "Invalid message list response")?;
    messages.into_iter().map(WireMessage::into_record).collect()
}

pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Build from config, reading the token from the configured env var.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env)
            .map_err(|_| anyhow::anyhow!("{} not set", config.token_env))?;
        Self::new(
            &config.base_url,
            &token,
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn list(
        &self,
        channel_id: &str,
        cursor: Option<(&str, &str)>,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let limit = limit.clamp(1, MAX_BATCH).to_string();
        let mut query = vec![("limit", limit.as_str())];
        if let Some(c) = cursor {
            query.push(c);
        }

        let resp = self
            .client
            .get(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .query(&query)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("GET {} failed: {}", url, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "GET {} failed (HTTP {}): {}",
                url,
                status,
                body.chars().take(500).collect::<String>()
            );
        }

        let body = resp.text().await?;
        let records = parse_messages(&body)?;
        debug!(channel = channel_id, cursor = ?cursor, returned = records.len(), "remote batch");
        Ok(records)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_before(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>> {
        self.list(channel_id, before.map(|b| ("before", b)), limit)
            .await
    }

    async fn fetch_after(
        &self,
        channel_id: &str,
        after: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>> {
        self.list(channel_id, Some(("after", after)), limit).await
    }

    async fn fetch_around(
        &self,
        channel_id: &str,
        around: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>> {
        self.list(channel_id, Some(("around", around)), limit).await
    }
}
