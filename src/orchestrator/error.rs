use std::time::Duration;

use thiserror::Error;

use crate::error::CodecError;

/// Terminal failure of one job. Reported in that job's outcome slot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    #[error("job {job_id} failed after {attempts} attempt(s): {source}")]
    Failed {
        job_id: usize,
        attempts: u32,
        source: CodecError,
        /// Error of the fallback attempt, when one was made.
        fallback: Option<CodecError>,
    },
    #[error("job {job_id} was cancelled")]
    Cancelled { job_id: usize },
    #[error("job {job_id} exceeded its {budget:?} budget")]
    TimedOut { job_id: usize, budget: Duration },
}

/// Misuse of the batch API. The only errors `submit_batch` itself returns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("batch contains no jobs")]
    EmptyBatch,
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,
    #[error("cache byte budget must be at least 1")]
    InvalidCacheBudget,
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<std::io::Error> for BatchError {
    fn from(err: std::io::Error) -> Self {
        BatchError::Runtime(err.to_string())
    }
}
