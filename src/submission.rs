//! # Submission Coordinator
//!
//! Hands a finished upload to the transcription provider and registers the
//! resulting job before the caller learns the request id. The provider only
//! acknowledges the job here; the transcript arrives later through the
//! webhook, so this never waits for transcription to finish.

use crate::jobs::{JobError, JobLifecycle};
use crate::provider::{AudioUpload, DispatchError, TranscriptionProvider};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Provider did not accept the audio; no job was created
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Provider accepted the audio but the id could not be registered
    #[error(transparent)]
    Register(#[from] JobError),
}

/// Receipt handed back to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub request_id: String,
}

#[derive(Clone)]
pub struct SubmissionCoordinator {
    provider: Arc<dyn TranscriptionProvider>,
    jobs: JobLifecycle,
    callback_url: String,
}

impl SubmissionCoordinator {
    pub fn new(provider: Arc<dyn TranscriptionProvider>, jobs: JobLifecycle, callback_url: String) -> Self {
        Self {
            provider,
            jobs,
            callback_url,
        }
    }

    pub fn provider(&self) -> &dyn TranscriptionProvider {
        self.provider.as_ref()
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Dispatch `upload` and register the job the provider created for it.
    ///
    /// ## Errors:
    /// - **Dispatch**: Provider unreachable, unconfigured or rejected the audio
    /// - **Register**: Provider reused an id that is still tracked
    pub async fn submit(&self, upload: AudioUpload) -> Result<Submission, SubmissionError> {
        info!(
            filename = %upload.filename,
            size_bytes = upload.bytes.len(),
            provider = %self.provider.name(),
            "Submitting audio for transcription"
        );

        let filename = upload.filename.clone();
        let request_id = self
            .provider
            .dispatch(upload, &self.callback_url)
            .await
            .map_err(|e| {
                error!(filename = %filename, error = %e, "Transcription dispatch failed");
                e
            })?;

        self.jobs.register(&request_id, &filename)?;

        Ok(Submission { request_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::record::JobStatus;
    use crate::jobs::{JobStore, SystemClock};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider double that replays scripted responses.
    struct ScriptedProvider {
        responses: Mutex<Vec<Result<String, DispatchError>>>,
        seen_callbacks: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<String, DispatchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                seen_callbacks: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TranscriptionProvider for ScriptedProvider {
        async fn dispatch(&self, _upload: AudioUpload, callback_url: &str) -> Result<String, DispatchError> {
            self.seen_callbacks.lock().unwrap().push(callback_url.to_string());
            self.responses.lock().unwrap().remove(0)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn upload(name: &str) -> AudioUpload {
        AudioUpload {
            filename: name.to_string(),
            mime_type: "audio/wav".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    fn coordinator(provider: Arc<ScriptedProvider>) -> (SubmissionCoordinator, JobLifecycle) {
        let jobs = JobLifecycle::new(JobStore::new(), Arc::new(SystemClock));
        let coordinator = SubmissionCoordinator::new(provider, jobs.clone(), "http://relay.test/webhook".to_string());
        (coordinator, jobs)
    }

    #[tokio::test]
    async fn test_accepted_submission_registers_job() {
        let provider = ScriptedProvider::new(vec![Ok("abc123".to_string())]);
        let (coordinator, jobs) = coordinator(provider.clone());

        let submission = coordinator.submit(upload("a.wav")).await.unwrap();
        assert_eq!(submission.request_id, "abc123");

        let record = jobs.store().get("abc123").unwrap();
        assert_eq!(record.filename, "a.wav");
        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(
            provider.seen_callbacks.lock().unwrap().as_slice(),
            ["http://relay.test/webhook".to_string()]
        );
    }

    #[tokio::test]
    async fn test_rejected_submission_creates_no_job() {
        let provider = ScriptedProvider::new(vec![Err(DispatchError::Rejected {
            status: 400,
            body: "unsupported media".to_string(),
        })]);
        let (coordinator, jobs) = coordinator(provider);

        let err = coordinator.submit(upload("a.wav")).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Dispatch(DispatchError::Rejected { status: 400, .. })));
        assert!(jobs.store().is_empty());
    }

    #[tokio::test]
    async fn test_reused_request_id_is_rejected() {
        let provider = ScriptedProvider::new(vec![Ok("dup".to_string()), Ok("dup".to_string())]);
        let (coordinator, jobs) = coordinator(provider);

        coordinator.submit(upload("first.wav")).await.unwrap();
        let err = coordinator.submit(upload("second.wav")).await.unwrap_err();

        assert!(matches!(err, SubmissionError::Register(JobError::DuplicateId(_))));
        assert_eq!(jobs.store().get("dup").unwrap().filename, "first.wav");
    }
}
