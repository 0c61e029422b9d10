//! # Application State Management
//!
//! Shared state handed to every HTTP handler through `web::Data<AppState>`.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Every actix worker thread gets a clone of `AppState`; the
//!   clones all point at the same job store and metrics
//! - **Memory safety**: Data is freed when the last clone is dropped
//!
//! ### RwLock (Reader-Writer Lock)
//! - **Purpose**: Many readers OR one writer at a time
//! - **Used for**: Request metrics here, and the job map inside `JobStore`
//!
//! ## What lives here:
//! - **config**: Immutable after startup, so a plain `Arc`
//! - **jobs / status / submissions**: The job-correlation components, all
//!   backed by the same `JobStore`
//! - **metrics**: Request counters maintained by `MetricsMiddleware`

use crate::config::AppConfig;
use crate::jobs::{Clock, JobLifecycle, JobStore, StatusQuery};
use crate::provider::TranscriptionProvider;
use crate::submission::SubmissionCoordinator;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Registration, callback transitions and reclamation
    pub jobs: JobLifecycle,

    /// Read-only lookups for pollers
    pub status: StatusQuery,

    /// Upload dispatch to the transcription provider
    pub submissions: SubmissionCoordinator,

    /// Performance metrics (updated by every request)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Request metrics collected across all HTTP requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,

    /// Key: method plus matched route pattern (e.g., "GET /status/{request_id}")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Wire the job components together around one shared store.
    pub fn new(config: AppConfig, provider: Arc<dyn TranscriptionProvider>, clock: Arc<dyn Clock>) -> Self {
        let store = JobStore::new();
        let jobs = JobLifecycle::new(store.clone(), clock);
        let status = StatusQuery::new(store);
        let submissions = SubmissionCoordinator::new(provider, jobs.clone(), config.callback_url());

        Self {
            config: Arc::new(config),
            jobs,
            status,
            submissions,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Record one finished request (called by the metrics middleware).
    pub fn record_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);

        metrics.request_count += 1;
        if is_error {
            metrics.error_count += 1;
        }

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Copy of the current metrics, so the lock isn't held while serializing.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl AppMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
