//! # Status Query Service
//!
//! Read-only view of a job for pollers. A job that was never registered and
//! one that was already reclaimed both come back as [`StatusView::Unknown`];
//! clients should stop polling when they see it.

use super::record::{ErrorDetail, JobRecord, JobStatus, TranscriptPayload};
use super::store::JobStore;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a poller sees for a `request_id`.
///
/// ## JSON Shape:
/// ```json
/// { "status": "completed", "request_id": "abc123", "filename": "a.wav",
///   "created_at": "...", "completed_at": "...",
///   "transcription": "hello world", "metadata": { "duration": 12.3, ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusView {
    Unknown,
    Processing {
        request_id: String,
        filename: String,
        created_at: DateTime<Utc>,
    },
    Completed {
        request_id: String,
        filename: String,
        created_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        #[serde(flatten)]
        result: TranscriptPayload,
    },
    Failed {
        request_id: String,
        filename: String,
        created_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        error: ErrorDetail,
    },
}

impl StatusView {
    pub fn is_unknown(&self) -> bool {
        matches!(self, StatusView::Unknown)
    }
}

impl From<JobRecord> for StatusView {
    fn from(record: JobRecord) -> Self {
        let JobRecord {
            request_id,
            filename,
            created_at,
            status,
        } = record;

        match status {
            JobStatus::Processing => StatusView::Processing {
                request_id,
                filename,
                created_at,
            },
            JobStatus::Completed { result, completed_at } => StatusView::Completed {
                request_id,
                filename,
                created_at,
                completed_at,
                result,
            },
            JobStatus::Failed { error, completed_at } => StatusView::Failed {
                request_id,
                filename,
                created_at,
                completed_at,
                error,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusQuery {
    store: JobStore,
}

impl StatusQuery {
    pub fn new(store: JobStore) -> Self {
        Self { store }
    }

    pub fn query(&self, request_id: &str) -> StatusView {
        self.store
            .get(request_id)
            .map(StatusView::from)
            .unwrap_or(StatusView::Unknown)
    }
}
