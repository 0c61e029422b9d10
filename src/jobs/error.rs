use thiserror::Error;

/// Errors raised by the job lifecycle.
///
/// Neither variant is fatal: `DuplicateId` is surfaced to the submitter,
/// `UnknownJob` is logged by the webhook and acknowledged anyway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// A job with this provider identifier is already registered
    #[error("job '{0}' is already registered")]
    DuplicateId(String),

    /// Callback referenced a job that never existed or was already reclaimed
    #[error("no job registered for request id '{0}'")]
    UnknownJob(String),
}
