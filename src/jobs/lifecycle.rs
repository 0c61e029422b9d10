//! # Job Lifecycle Manager
//!
//! Owns every state change a job goes through:
//! - **register**: insert a `processing` record once the provider accepts an upload
//! - **apply_callback**: move a `processing` record to `completed` or `failed`
//! - **reclaim**: drop terminal records that outlived the retention window
//!
//! ## Idempotency:
//! Providers may deliver the same callback more than once. Only the first
//! delivery for a `processing` job changes anything; later ones are reported
//! as [`CallbackDisposition::AlreadyTerminal`] and leave the record untouched.

use super::clock::Clock;
use super::error::JobError;
use super::record::{CallbackOutcome, JobRecord};
use super::store::JobStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What a callback did to its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackDisposition {
    /// The job transitioned to the given terminal status
    Applied(&'static str),
    /// The job was already terminal; nothing changed
    AlreadyTerminal,
}

#[derive(Clone)]
pub struct JobLifecycle {
    store: JobStore,
    clock: Arc<dyn Clock>,
}

impl JobLifecycle {
    pub fn new(store: JobStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Register a job the provider just accepted.
    ///
    /// ## Errors:
    /// - **DuplicateId**: A job with this id is already tracked; it is left as is
    pub fn register(&self, request_id: &str, filename: &str) -> Result<(), JobError> {
        let record = JobRecord::processing(request_id, filename, self.clock.now());
        if !self.store.insert_if_absent(record) {
            warn!(request_id = %request_id, "Refusing to register duplicate job");
            return Err(JobError::DuplicateId(request_id.to_string()));
        }

        info!(request_id = %request_id, filename = %filename, "Registered transcription job");
        Ok(())
    }

    /// Apply a provider callback to the matching job.
    ///
    /// The lookup, the terminal check and the replacement happen under one
    /// write lock, so two racing deliveries cannot both apply.
    ///
    /// ## Errors:
    /// - **UnknownJob**: No such job (never registered, or already reclaimed)
    pub fn apply_callback(&self, request_id: &str, outcome: CallbackOutcome) -> Result<CallbackDisposition, JobError> {
        let now = self.clock.now();

        let disposition = self
            .store
            .update(request_id, |current| match current.resolve(outcome, now) {
                Some(next) => (CallbackDisposition::Applied(next.status.as_str()), Some(next)),
                None => (CallbackDisposition::AlreadyTerminal, None),
            })
            .ok_or_else(|| JobError::UnknownJob(request_id.to_string()))?;

        match disposition {
            CallbackDisposition::Applied(status) => {
                info!(request_id = %request_id, status = %status, "Transcription job resolved");
            }
            CallbackDisposition::AlreadyTerminal => {
                debug!(request_id = %request_id, "Ignoring callback for already resolved job");
            }
        }

        Ok(disposition)
    }

    /// Delete terminal jobs whose `completed_at` is more than `retention` before `now`.
    ///
    /// Jobs still `processing` are kept regardless of age.
    ///
    /// ## Returns:
    /// Number of jobs removed.
    pub fn reclaim(&self, retention: chrono::Duration, now: DateTime<Utc>) -> usize {
        let removed = self.store.retain(|record| {
            let expired = record.is_expired(retention, now);
            if expired {
                debug!(request_id = %record.request_id, "Reclaiming transcription job");
            }
            !expired
        });

        if removed > 0 {
            info!(removed = removed, remaining = self.store.len(), "Reclamation sweep finished");
        }

        removed
    }

    /// Run [`reclaim`](Self::reclaim) every `period` on the tokio runtime.
    ///
    /// The first sweep happens one full period after spawning. Abort the
    /// returned handle to stop the task.
    pub fn spawn_reclaimer(&self, period: Duration, retention: Duration) -> JoinHandle<()> {
        let lifecycle = self.clone();
        let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let now = lifecycle.now();
                lifecycle.reclaim(retention, now);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::clock::ManualClock;
    use crate::jobs::record::{JobStatus, TranscriptMetadata, TranscriptPayload};
    use chrono::TimeZone;

    fn setup() -> (JobLifecycle, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()));
        (JobLifecycle::new(JobStore::new(), clock.clone()), clock)
    }

    fn success(text: &str) -> CallbackOutcome {
        CallbackOutcome::Success(TranscriptPayload {
            transcript: text.to_string(),
            metadata: TranscriptMetadata {
                duration: Some(12.3),
                channels: Some(1),
                created: None,
            },
        })
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let (jobs, _clock) = setup();
        jobs.register("abc", "first.wav").unwrap();

        let err = jobs.register("abc", "second.wav").unwrap_err();
        assert_eq!(err, JobError::DuplicateId("abc".to_string()));
        assert_eq!(jobs.store().get("abc").unwrap().filename, "first.wav");
    }

    #[test]
    fn test_callback_applies_once() {
        let (jobs, clock) = setup();
        jobs.register("abc", "a.wav").unwrap();
        assert_eq!(jobs.store().get("abc").map(|record| record.status), Some(JobStatus::Processing));

        clock.advance(chrono::Duration::seconds(30));
        let first = jobs.apply_callback("abc", success("hello world")).unwrap();
        assert_eq!(first, CallbackDisposition::Applied("completed"));
        let completed_at = jobs.store().get("abc").unwrap().status.completed_at();

        clock.advance(chrono::Duration::seconds(30));
        let second = jobs.apply_callback("abc", success("something else")).unwrap();
        assert_eq!(second, CallbackDisposition::AlreadyTerminal);

        let record = jobs.store().get("abc").unwrap();
        assert_eq!(record.status.completed_at(), completed_at);
        match record.status {
            JobStatus::Completed { result, .. } => assert_eq!(result.transcript, "hello world"),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn test_failure_after_success_is_ignored() {
        let (jobs, _clock) = setup();
        jobs.register("abc", "a.wav").unwrap();
        jobs.apply_callback("abc", success("hi")).unwrap();

        let disposition = jobs.apply_callback("abc", CallbackOutcome::Failure("late".into())).unwrap();
        assert_eq!(disposition, CallbackDisposition::AlreadyTerminal);
        assert_eq!(jobs.store().get("abc").unwrap().status.as_str(), "completed");
    }

    #[test]
    fn test_unknown_callback_leaves_store_unchanged() {
        let (jobs, _clock) = setup();
        jobs.register("known", "a.wav").unwrap();
        let before = jobs.store().get("known");

        let err = jobs.apply_callback("ghost", success("hi")).unwrap_err();
        assert_eq!(err, JobError::UnknownJob("ghost".to_string()));
        assert_eq!(jobs.store().len(), 1);
        assert_eq!(jobs.store().get("known"), before);
    }

    #[test]
    fn test_reclaim_respects_retention_and_skips_processing() {
        let (jobs, clock) = setup();
        let retention = chrono::Duration::hours(1);

        jobs.register("done", "a.wav").unwrap();
        jobs.register("stuck", "b.wav").unwrap();
        jobs.apply_callback("done", CallbackOutcome::Failure("bad audio".into())).unwrap();

        clock.advance(chrono::Duration::minutes(59));
        assert_eq!(jobs.reclaim(retention, jobs.now()), 0);
        assert!(jobs.store().get("done").is_some());

        clock.advance(chrono::Duration::minutes(2));
        assert_eq!(jobs.reclaim(retention, jobs.now()), 1);
        assert!(jobs.store().get("done").is_none());

        clock.advance(chrono::Duration::days(7));
        assert_eq!(jobs.reclaim(retention, jobs.now()), 0);
        assert_eq!(jobs.store().get("stuck").map(|record| record.status), Some(JobStatus::Processing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reclaimer_runs_on_its_period() {
        let (jobs, clock) = setup();
        jobs.register("abc", "a.wav").unwrap();
        jobs.apply_callback("abc", success("hi")).unwrap();
        clock.advance(chrono::Duration::hours(2));

        let handle = jobs.spawn_reclaimer(Duration::from_secs(3600), Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_secs(1800)).await;
        assert!(jobs.store().get("abc").is_some());

        tokio::time::sleep(Duration::from_secs(1801)).await;
        assert!(jobs.store().get("abc").is_none());

        handle.abort();
    }
}
