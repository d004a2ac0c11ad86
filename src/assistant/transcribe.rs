//! Audio transcription via the provider media endpoint and speech-to-text

use std::time::Duration;

use async_trait::async_trait;

use crate::provider::ProviderClient;
use crate::{Error, Result};

/// Transcription seam between the webhook dispatcher and speech-to-text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Fetch the referenced audio and return its transcript
    ///
    /// # Errors
    ///
    /// Returns `Error::MediaFetch` or `Error::Transcription`; the caller
    /// treats both as one "transcription failed" outcome
    async fn transcribe(&self, instance: &str, api_key: &str, media_id: &str) -> Result<String>;
}

/// Response from the speech-to-text endpoint
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcriber backed by the provider media endpoint and a Whisper-style API
pub struct SpeechTranscriber {
    provider: ProviderClient,
    client: reqwest::Client,
    base_url: String,
    model: String,
    language: String,
}

impl SpeechTranscriber {
    /// Create a new speech transcriber
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be built
    pub fn new(
        provider: ProviderClient,
        base_url: &str,
        model: &str,
        language: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            provider,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            language: language.to_string(),
        })
    }
}

#[async_trait]
impl Transcriber for SpeechTranscriber {
    async fn transcribe(&self, instance: &str, api_key: &str, media_id: &str) -> Result<String> {
        let audio = self.provider.fetch_media(instance, media_id).await?;
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("audio.ogg")
                    .mime_str("audio/ogg")
                    .map_err(|e| Error::Transcription(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transcription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "speech-to-text error");
            return Err(Error::Transcription(format!(
                "speech-to-text returned {status}"
            )));
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(e.to_string()))?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}
