//! # Job Records
//!
//! One record per transcription request the provider accepted. The terminal
//! data (`result`, `error`, `completed_at`) lives inside [`JobStatus`] so a
//! record can only carry a transcript when it is completed, and only carry an
//! error when it has failed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Audio metadata reported by the provider alongside the transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranscriptMetadata {
    /// Length of the audio in seconds
    pub duration: Option<f64>,
    /// Number of audio channels the provider processed
    pub channels: Option<u32>,
    /// Provider-side creation time of the transcription (as sent)
    pub created: Option<String>,
}

/// Successful transcription result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptPayload {
    #[serde(rename = "transcription")]
    pub transcript: String,
    pub metadata: TranscriptMetadata,
}

/// Error body from a failed transcription callback.
///
/// The provider sends either a plain string or an object, so the body is kept
/// as raw JSON and rendered on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorDetail(serde_json::Value);

impl ErrorDetail {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(message) => f.write_str(message),
            other => write!(f, "{}", other),
        }
    }
}

impl From<&str> for ErrorDetail {
    fn from(message: &str) -> Self {
        Self(serde_json::Value::String(message.to_string()))
    }
}

/// What a provider callback reported for a job.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    Success(TranscriptPayload),
    Failure(ErrorDetail),
}

/// Current lifecycle state of a job.
///
/// ## State Transitions:
/// Processing → Completed | Failed. Both targets are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Dispatched to the provider, waiting for the callback
    Processing,

    /// Callback delivered a transcript
    Completed {
        result: TranscriptPayload,
        completed_at: DateTime<Utc>,
    },

    /// Callback delivered an error body
    Failed {
        error: ErrorDetail,
        completed_at: DateTime<Utc>,
    },
}

impl JobStatus {
    /// Status string used in API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed { .. } => "completed",
            JobStatus::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }

    /// When the job reached its terminal state, if it has.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            JobStatus::Processing => None,
            JobStatus::Completed { completed_at, .. } | JobStatus::Failed { completed_at, .. } => {
                Some(*completed_at)
            }
        }
    }
}

/// A transcription job, keyed by the provider's `request_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub request_id: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
}

impl JobRecord {
    /// A freshly dispatched job.
    pub fn processing(request_id: impl Into<String>, filename: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            request_id: request_id.into(),
            filename: filename.into(),
            created_at: now,
            status: JobStatus::Processing,
        }
    }

    /// Build the terminal successor of this record.
    ///
    /// Returns `None` when the record is already terminal; terminal records
    /// are never rewritten.
    pub fn resolve(&self, outcome: CallbackOutcome, now: DateTime<Utc>) -> Option<Self> {
        if self.status.is_terminal() {
            return None;
        }

        let status = match outcome {
            CallbackOutcome::Success(result) => JobStatus::Completed {
                result,
                completed_at: now,
            },
            CallbackOutcome::Failure(error) => JobStatus::Failed {
                error,
                completed_at: now,
            },
        };

        Some(Self {
            status,
            ..self.clone()
        })
    }

    /// Whether a terminal record has outlived the retention window.
    /// Processing records never expire.
    pub fn is_expired(&self, retention: chrono::Duration, now: DateTime<Utc>) -> bool {
        match self.status.completed_at() {
            Some(completed_at) => now.signed_duration_since(completed_at) > retention,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn hello() -> CallbackOutcome {
        CallbackOutcome::Success(TranscriptPayload {
            transcript: "hello".to_string(),
            metadata: TranscriptMetadata::default(),
        })
    }

    #[test]
    fn test_resolve_only_from_processing() {
        let record = JobRecord::processing("abc", "a.wav", t0());
        assert_eq!(record.status.as_str(), "processing");
        assert_eq!(record.status.completed_at(), None);

        let done = record.resolve(hello(), t0() + Duration::seconds(5)).unwrap();
        assert_eq!(done.status.as_str(), "completed");
        assert_eq!(done.status.completed_at(), Some(t0() + Duration::seconds(5)));
        assert_eq!(done.created_at, t0());
        assert_eq!(done.filename, "a.wav");

        assert!(done.resolve(CallbackOutcome::Failure("late".into()), t0()).is_none());
    }

    #[test]
    fn test_expiry_is_strictly_after_retention() {
        let retention = Duration::hours(1);
        let record = JobRecord::processing("abc", "a.wav", t0());
        assert!(!record.is_expired(retention, t0() + Duration::days(30)));

        let failed = record.resolve(CallbackOutcome::Failure("boom".into()), t0()).unwrap();
        assert!(!failed.is_expired(retention, t0() + retention));
        assert!(failed.is_expired(retention, t0() + retention + Duration::seconds(1)));
    }

    #[test]
    fn test_error_detail_display() {
        assert_eq!(ErrorDetail::from("bad audio").to_string(), "bad audio");

        let object = ErrorDetail::new(serde_json::json!({"code": 400}));
        assert_eq!(object.to_string(), r#"{"code":400}"#);
    }
}
