//! Deepgram pre-recorded transcription client.
//!
//! Audio is posted to `/v1/listen` with a `callback` query parameter, so
//! Deepgram answers immediately with a `request_id` and delivers the transcript
//! to our webhook once it is ready.

use super::{AudioUpload, DispatchError, TranscriptionProvider};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

/// Maximum length of a provider error body kept for logs and API errors.
const MAX_ERROR_BODY_LENGTH: usize = 500;

fn truncate_error_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

/// Acknowledgement body for a callback-mode `listen` request.
#[derive(Debug, Deserialize)]
struct ListenAccepted {
    request_id: String,
}

pub struct DeepgramClient {
    client: Client,
    config: ProviderConfig,
}

impl DeepgramClient {
    pub fn new(config: ProviderConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn listen_url(&self) -> String {
        format!("{}/v1/listen", self.config.base_url.trim_end_matches('/'))
    }

    /// Query parameters sent with every `listen` request.
    fn listen_params<'a>(&'a self, callback_url: &'a str) -> Vec<(&'static str, &'a str)> {
        let flag = |enabled: bool| if enabled { "true" } else { "false" };
        vec![
            ("callback", callback_url),
            ("model", self.config.model.as_str()),
            ("smart_format", flag(self.config.smart_format)),
            ("detect_language", flag(self.config.detect_language)),
            ("diarize", flag(self.config.diarize)),
            ("utterances", flag(self.config.utterances)),
        ]
    }
}

/// Pull the request id out of an acceptance body.
fn parse_acceptance(body: &str) -> Result<String, DispatchError> {
    let accepted: ListenAccepted = serde_json::from_str(body)
        .map_err(|e| DispatchError::InvalidResponse(format!("{}: {}", e, truncate_error_body(body))))?;

    if accepted.request_id.trim().is_empty() {
        return Err(DispatchError::InvalidResponse("empty request_id".to_string()));
    }
    Ok(accepted.request_id)
}

#[async_trait]
impl TranscriptionProvider for DeepgramClient {
    async fn dispatch(&self, upload: AudioUpload, callback_url: &str) -> Result<String, DispatchError> {
        let api_key = self.config.api_key.as_deref().ok_or(DispatchError::NotConfigured)?;

        debug!(
            filename = %upload.filename,
            mime_type = %upload.mime_type,
            size_bytes = upload.bytes.len(),
            callback_url = %callback_url,
            "Dispatching audio to Deepgram"
        );

        let response = self
            .client
            .post(self.listen_url())
            .query(&self.listen_params(callback_url))
            .header(AUTHORIZATION, format!("Token {}", api_key))
            .header(CONTENT_TYPE, upload.mime_type.as_str())
            .body(upload.bytes)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let body = truncate_error_body(&body);
            error!(status = status.as_u16(), body = %body, "Deepgram rejected transcription request");
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let request_id = parse_acceptance(&body)?;
        info!(request_id = %request_id, filename = %upload.filename, "Deepgram accepted transcription request");
        Ok(request_id)
    }

    fn name(&self) -> &str {
        "deepgram"
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}
