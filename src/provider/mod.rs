//! # Transcription Provider Integration
//!
//! Outbound dispatch of uploaded audio to the asynchronous transcription
//! provider, and parsing of the callbacks it later posts back.
//!
//! ## Key Components:
//! - **TranscriptionProvider**: Trait seam for dispatching audio (faked in tests)
//! - **DeepgramClient**: `reqwest` implementation against Deepgram's `listen` API
//! - **callback**: Turns a raw webhook body into a request id plus outcome

pub mod callback;
pub mod deepgram;

pub use callback::{parse_callback, ParsedCallback};
pub use deepgram::DeepgramClient;

use async_trait::async_trait;
use thiserror::Error;

/// An uploaded audio file ready for dispatch.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Reasons the provider did not accept a submission.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transcription provider is not configured (missing API key)")]
    NotConfigured,

    #[error("provider rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to reach the transcription provider: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Anything that can accept audio for asynchronous transcription.
///
/// Implementations return as soon as the provider acknowledges the job; the
/// transcript arrives later at `callback_url`.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Submit audio and return the provider-issued request id. The upload is
    /// consumed so its bytes move straight into the request body.
    async fn dispatch(&self, upload: AudioUpload, callback_url: &str) -> Result<String, DispatchError>;

    /// Short provider name for logs and health output.
    fn name(&self) -> &str;

    /// Whether the provider has the credentials it needs.
    fn is_configured(&self) -> bool {
        true
    }
}
