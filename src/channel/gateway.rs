//! Outbound side of the chat platform: text notices and the voice connection.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use super::ChannelId;

/// Posts a text message to a channel.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<()>;
}

/// Joins and leaves the voice channel being recorded.
#[async_trait]
pub trait VoiceLink: Send + Sync {
    async fn join(&self, channel: &ChannelId) -> Result<()>;
    async fn leave(&self, channel: &ChannelId) -> Result<()>;
}

/// Upper bound for a single call to the platform adapter.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Await a gateway call for at most `limit`. Running out of time is an error.
pub async fn bounded<F>(limit: Duration, action: &str, call: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("{} timed out after {}ms", action, limit.as_millis()),
    }
}

/// Best-effort send. Failures and timeouts are logged and never propagated.
pub async fn notify(
    sink: &dyn NotificationSink,
    channel: &ChannelId,
    text: &str,
    limit: Duration,
) {
    if let Err(e) = bounded(limit, "notice", sink.send(channel, text)).await {
        warn!("Could not send notice to channel {}: {:#}", channel, e);
    }
}

/// Gateway used when no platform adapter is configured.
#[derive(Debug, Clone, Default)]
pub struct LogGateway;

#[async_trait]
impl NotificationSink for LogGateway {
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<()> {
        info!("[{}] {}", channel, text);
        Ok(())
    }
}

#[async_trait]
impl VoiceLink for LogGateway {
    async fn join(&self, channel: &ChannelId) -> Result<()> {
        info!("Joining voice channel {}", channel);
        Ok(())
    }

    async fn leave(&self, channel: &ChannelId) -> Result<()> {
        info!("Leaving voice channel {}", channel);
        Ok(())
    }
}

/// Forwards notices and voice requests to the platform adapter over HTTP.
///
/// - `POST {base}/notify` with `{"channel_id", "text"}`
/// - `POST {base}/voice/join` and `{base}/voice/leave` with `{"channel_id"}`
pub struct WebhookGateway {
    client: reqwest::Client,
    base_url: String,
}

impl WebhookGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build chat gateway HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach chat gateway at {url}"))?
            .error_for_status()
            .with_context(|| format!("Chat gateway rejected {path}"))?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WebhookGateway {
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<()> {
        self.post("/notify", json!({ "channel_id": channel, "text": text }))
            .await
    }
}

#[async_trait]
impl VoiceLink for WebhookGateway {
    async fn join(&self, channel: &ChannelId) -> Result<()> {
        self.post("/voice/join", json!({ "channel_id": channel })).await
    }

    async fn leave(&self, channel: &ChannelId) -> Result<()> {
        self.post("/voice/leave", json!({ "channel_id": channel }))
            .await
    }
}
