//! Messaging provider client (send text, fetch media)

pub mod payload;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::{Error, Result};

pub use payload::{MessageContent, MessageData, MessageKey, WebhookEvent};

/// Outbound delivery seam between the webhook dispatcher and the provider
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver a text reply to the counterparty
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects or cannot be reached
    async fn send_text(&self, instance: &str, number: &str, text: &str) -> Result<()>;
}

/// Body of the provider send-text call
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendTextRequest<'a> {
    number: &'a str,
    text: &'a str,
    link_preview: bool,
    readchat: bool,
    delay: u32,
}

/// HTTP client for the messaging provider API
#[derive(Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    send_delay_ms: u32,
}

impl ProviderClient {
    /// Create a new provider client
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be built
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        send_delay_ms: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            send_delay_ms,
        })
    }

    /// Fetch the raw bytes of a referenced media asset
    ///
    /// # Errors
    ///
    /// Returns `Error::MediaFetch` if the endpoint is unreachable or non-success
    pub async fn fetch_media(&self, instance: &str, media_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/message/media/{instance}/{media_id}", self.base_url);
        tracing::debug!(%media_id, "fetching media from provider");

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::MediaFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "media fetch failed");
            return Err(Error::MediaFetch(format!("provider returned {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::MediaFetch(e.to_string()))?;

        tracing::debug!(bytes = bytes.len(), "media fetched");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Messenger for ProviderClient {
    async fn send_text(&self, instance: &str, number: &str, text: &str) -> Result<()> {
        let url = format!("{}/message/sendText/{instance}", self.base_url);

        let request = SendTextRequest {
            number,
            text,
            link_preview: false,
            readchat: true,
            delay: self.send_delay_ms,
        };

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Send(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "send text failed");
            return Err(Error::Send(format!("provider returned {status}")));
        }

        tracing::info!(to = %number, chars = text.chars().count(), "message delivered");
        Ok(())
    }
}
