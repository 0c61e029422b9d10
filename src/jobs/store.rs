//! # Job Store
//!
//! Thread-safe map from provider `request_id` to [`JobRecord`].
//!
//! ## Thread Safety:
//! Uses `Arc<RwLock<HashMap>>` so any number of pollers can read at once while
//! the webhook and the reclamation sweep take short exclusive locks. Records
//! are replaced whole inside a single write lock and handed out as clones, so
//! a reader sees either the old record or the new one, never a mix.
//!
//! No lock is ever held across an `.await` and no I/O happens inside a
//! critical section.

use super::record::{JobRecord, JobStatus};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, JobRecord>>>,
}

/// Count of live jobs per status, for health reporting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.processing + self.completed + self.failed
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written record
    // behind (records are swapped whole), so a poisoned map is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobRecord>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobRecord>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite the record stored under `request_id`.
    pub fn put(&self, request_id: &str, record: JobRecord) {
        self.write().insert(request_id.to_string(), record);
    }

    /// Insert `record` only if its `request_id` is not already present.
    ///
    /// ## Returns:
    /// - **true**: Record inserted
    /// - **false**: Key already existed, the existing record is untouched
    pub fn insert_if_absent(&self, record: JobRecord) -> bool {
        let mut jobs = self.write();
        if jobs.contains_key(&record.request_id) {
            return false;
        }
        jobs.insert(record.request_id.clone(), record);
        true
    }

    /// Snapshot of the record for `request_id`.
    pub fn get(&self, request_id: &str) -> Option<JobRecord> {
        self.read().get(request_id).cloned()
    }

    /// Remove a record. Returns whether anything was removed.
    pub fn delete(&self, request_id: &str) -> bool {
        self.write().remove(request_id).is_some()
    }

    /// Atomically inspect a record and optionally replace it.
    ///
    /// `f` receives the current record and returns the value to hand back
    /// together with an optional replacement. Returns `None` if the key is
    /// absent.
    pub fn update<R>(&self, request_id: &str, f: impl FnOnce(&JobRecord) -> (R, Option<JobRecord>)) -> Option<R> {
        let mut jobs = self.write();
        let current = jobs.get(request_id)?;
        let (result, replacement) = f(current);
        if let Some(record) = replacement {
            jobs.insert(request_id.to_string(), record);
        }
        Some(result)
    }

    /// Visit every record under a read lock.
    pub fn for_each(&self, mut f: impl FnMut(&JobRecord)) {
        for record in self.read().values() {
            f(record);
        }
    }

    /// Delete every record for which `keep` returns false, under one write lock.
    /// Returns how many were removed.
    pub fn retain(&self, mut keep: impl FnMut(&JobRecord) -> bool) -> usize {
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, record| keep(record));
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        self.for_each(|record| match record.status {
            JobStatus::Processing => counts.processing += 1,
            JobStatus::Completed { .. } => counts.completed += 1,
            JobStatus::Failed { .. } => counts.failed += 1,
        });
        counts
    }
}
