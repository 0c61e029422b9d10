//! # Transcription Job Tracking
//!
//! Correlates asynchronous provider callbacks with the uploads that started them.
//!
//! ## Lifecycle:
//! 1. **processing**: Provider accepted the audio and issued a `request_id`
//! 2. **completed**: Callback delivered a transcript (terminal)
//! 3. **failed**: Callback delivered an error body (terminal)
//! 4. **removed**: Reclamation sweep dropped a terminal job after the retention window
//!
//! ## Key Components:
//! - **JobStore**: Lock-protected map, the single source of truth for job state
//! - **JobLifecycle**: Registration, callback transitions and reclamation
//! - **StatusQuery**: Read-only view served to pollers
//! - **Clock**: Injected time source so reclamation can be tested without sleeping

pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod query;
pub mod record;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use error::JobError;
pub use lifecycle::{CallbackDisposition, JobLifecycle};
pub use query::StatusQuery;
pub use record::{CallbackOutcome, ErrorDetail, TranscriptMetadata, TranscriptPayload};
pub use store::JobStore;
