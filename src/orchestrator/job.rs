use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time::Instant;

use crate::codec::EncodedResult;
use crate::error::CodecError;
use crate::pixel_buffer::PixelBuffer;
use crate::plan::EncodePlan;

use super::cache::Fingerprint;
use super::error::JobError;

/// One unit of work submitted to the orchestrator.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub buffer: Arc<PixelBuffer>,
    pub plan: EncodePlan,
}

impl BatchJob {
    pub fn new(buffer: Arc<PixelBuffer>, plan: EncodePlan) -> Self {
        Self { buffer, plan }
    }
}

pub type JobOutcome = Result<EncodedResult, JobError>;

/// Batch-wide cancellation flag shared between the caller and the
/// coordinator.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Orchestrator bookkeeping for one submitted job.
#[derive(Debug)]
pub(crate) struct Job {
    pub id: usize,
    pub buffer: Arc<PixelBuffer>,
    pub original_plan: EncodePlan,
    pub plan: EncodePlan,
    /// Fingerprint of the requested plan. Kept across a fallback so the
    /// result is cached under what the caller asked for.
    pub fingerprint: Fingerprint,
    /// Set while this job is the one running for its fingerprint.
    pub leader: bool,
    pub attempts: u32,
    /// Retries spent on the current plan.
    pub retries: u32,
    pub fallback_used: bool,
    /// Error that triggered the fallback.
    pub original_error: Option<CodecError>,
    /// Set on first dispatch; every later attempt shares it.
    pub deadline: Option<Instant>,
    pub state: JobState,
}

impl Job {
    pub fn new(id: usize, job: BatchJob) -> Self {
        let fingerprint = Fingerprint::of(&job.buffer, &job.plan);
        Self {
            id,
            buffer: job.buffer,
            original_plan: job.plan,
            plan: job.plan,
            fingerprint,
            leader: false,
            attempts: 0,
            retries: 0,
            fallback_used: false,
            original_error: None,
            deadline: None,
            state: JobState::Queued,
        }
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Switches to the fallback plan. Returns `false` when the plan has none
    /// or it was already used.
    pub fn switch_to_fallback(&mut self, error: CodecError) -> bool {
        if self.fallback_used {
            return false;
        }
        let Some(fallback) = self.original_plan.fallback() else {
            return false;
        };
        self.plan = fallback;
        self.fallback_used = true;
        self.retries = 0;
        self.original_error = Some(error);
        self.state = JobState::Queued;
        true
    }

    pub fn into_failure(mut self, error: CodecError) -> JobError {
        self.state = JobState::Failed;
        match self.original_error.take() {
            Some(original) => JobError::Failed {
                job_id: self.id,
                attempts: self.attempts,
                source: original,
                fallback: Some(error),
            },
            None => JobError::Failed {
                job_id: self.id,
                attempts: self.attempts,
                source: error,
                fallback: None,
            },
        }
    }
}
