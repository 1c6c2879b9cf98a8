pub mod lifecycle;
pub mod types;

pub use lifecycle::{remote_execution_error, JobError, JobRunner, DEFAULT_POLL_INTERVAL};
pub use types::{CompletedJob, CreatedObject, JobMeta, JobState, JobStatus, JobSubmission};
