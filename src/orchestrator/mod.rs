//! Concurrent batch encoding.
//!
//! A single coordinator loop owns the FIFO queue. It admits jobs (cache
//! lookup, in-flight coalescing), dispatches at most `worker_count` attempts
//! into a `JoinSet`, and applies the retry / fallback policy to each report.
//! Attempts run on the blocking pool because the codecs are pure computation.
//!
//! ```text
//!   queue ──admit──┬── cache hit ────────────────┐
//!                  ├── same fingerprint running ─┤ (park, resolve with leader)
//!                  └── dispatch ── JoinSet ──────┴──> outcomes[index]
//!                          ▲           │
//!                          └── retry / fallback
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod job;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::codec::{EncodeScratch, EncodedResult, Optimization, encode_with_scratch};
use crate::error::{CodecError, CodecResult};
use crate::pixel_buffer::PixelBuffer;
use crate::plan::EncodePlan;
use crate::platform::{NoPlatformEncoder, PlatformEncoder};

pub use cache::{Fingerprint, ResultCache};
pub use config::OrchestratorConfig;
pub use error::{BatchError, JobError};
pub use job::{BatchJob, CancellationToken, JobOutcome};

use job::{Job, JobState};

/// Counters accumulated over the orchestrator's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    /// Attempts handed to a worker.
    pub codec_invocations: u64,
    /// Jobs resolved without running an encode.
    pub cache_hits: u64,
    pub retries: u64,
    pub fallbacks: u64,
    /// Attempts answered by the platform encoder.
    pub platform_encodes: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    codec_invocations: AtomicU64,
    cache_hits: AtomicU64,
    retries: AtomicU64,
    fallbacks: AtomicU64,
    platform_encodes: AtomicU64,
}

impl StatsCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> OrchestratorStats {
        OrchestratorStats {
            codec_invocations: self.codec_invocations.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            platform_encodes: self.platform_encodes.load(Ordering::Relaxed),
        }
    }
}

enum AttemptResult {
    Finished {
        result: CodecResult<EncodedResult>,
        platform_used: bool,
    },
    Panicked(String),
    TimedOut,
}

struct AttemptReport {
    job: Job,
    result: AttemptResult,
    /// Returned to the pool unless the worker was lost.
    scratch: Option<EncodeScratch>,
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string()),
        Err(err) => err.to_string(),
    }
}

/// One encode attempt on a worker thread.
fn run_attempt(
    buffer: &PixelBuffer,
    plan: &EncodePlan,
    platform: &dyn PlatformEncoder,
    platform_threshold: u64,
    scratch: &mut EncodeScratch,
) -> (CodecResult<EncodedResult>, bool) {
    if let Err(failure) = plan.validate() {
        return (Err(failure.into()), false);
    }
    if buffer.pixel_count() > platform_threshold && platform.is_available() {
        match platform.encode(buffer, plan) {
            Some(Ok(data)) => {
                let result = EncodedResult {
                    data,
                    width: buffer.width(),
                    height: buffer.height(),
                    family: plan.family(),
                    quality: plan.quality,
                    optimizations: vec![Optimization::PlatformEncoder],
                };
                return (Ok(result), true);
            }
            Some(Err(err)) => {
                warn!(encoder = platform.name(), error = %err, "platform encoder failed, using built-in codec");
            }
            None => {}
        }
    }
    (encode_with_scratch(buffer, plan, scratch), false)
}

type ProgressFn<'a> = &'a (dyn Fn(usize, &JobOutcome) + Send + Sync);

/// Mutable state of one `submit_batch` call.
struct BatchRun<'a> {
    queue: VecDeque<Job>,
    /// Followers parked behind the running leader of each fingerprint.
    inflight: HashMap<Fingerprint, Vec<Job>>,
    outcomes: Vec<Option<JobOutcome>>,
    scratch_pool: Vec<EncodeScratch>,
    progress: Option<ProgressFn<'a>>,
}

impl BatchRun<'_> {
    fn finish(&mut self, index: usize, outcome: JobOutcome) {
        if let Some(progress) = self.progress {
            progress(index, &outcome);
        }
        self.outcomes[index] = Some(outcome);
    }

    /// Puts parked followers back at the head of the queue, in order.
    fn release_followers(&mut self, fingerprint: &Fingerprint) {
        if let Some(followers) = self.inflight.remove(fingerprint) {
            for follower in followers.into_iter().rev() {
                self.queue.push_front(follower);
            }
        }
    }
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    cache: Arc<Mutex<ResultCache>>,
    platform: Arc<dyn PlatformEncoder>,
    stats: StatsCounters,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Result<Self, BatchError> {
        config.validate()?;
        Ok(Self {
            cache: Arc::new(Mutex::new(ResultCache::new(config.cache_byte_budget))),
            config,
            platform: Arc::new(NoPlatformEncoder),
            stats: StatsCounters::default(),
        })
    }

    pub fn with_platform_encoder(mut self, platform: Arc<dyn PlatformEncoder>) -> Self {
        self.platform = platform;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.stats.snapshot()
    }

    /// Encodes every job and returns one outcome per job, in input order.
    pub async fn submit_batch(&self, jobs: Vec<BatchJob>) -> Result<Vec<JobOutcome>, BatchError> {
        self.run(jobs, &CancellationToken::new(), None).await
    }

    /// As [`Orchestrator::submit_batch`], with cancellation and a callback
    /// invoked once per job as it reaches a terminal state.
    pub async fn submit_batch_with<F>(
        &self,
        jobs: Vec<BatchJob>,
        cancel: &CancellationToken,
        progress: F,
    ) -> Result<Vec<JobOutcome>, BatchError>
    where
        F: Fn(usize, &JobOutcome) + Send + Sync,
    {
        self.run(jobs, cancel, Some(&progress)).await
    }

    async fn run(
        &self,
        jobs: Vec<BatchJob>,
        cancel: &CancellationToken,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<JobOutcome>, BatchError> {
        if jobs.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        let total = jobs.len();
        info!(jobs = total, workers = self.config.worker_count, "batch started");

        let mut run = BatchRun {
            queue: jobs.into_iter().enumerate().map(|(id, job)| Job::new(id, job)).collect(),
            inflight: HashMap::new(),
            outcomes: (0..total).map(|_| None).collect(),
            scratch_pool: Vec::new(),
            progress,
        };
        let mut running: JoinSet<AttemptReport> = JoinSet::new();

        loop {
            while running.len() < self.config.worker_count {
                let Some(job) = run.queue.pop_front() else {
                    break;
                };
                if let Some(job) = self.admit(job, &mut run, cancel).await {
                    self.dispatch(job, &mut running, &mut run);
                }
            }

            let Some(joined) = running.join_next().await else {
                if run.queue.is_empty() {
                    break;
                }
                continue;
            };
            let report = joined.map_err(|err| BatchError::Runtime(err.to_string()))?;
            self.settle(report, &mut run, cancel).await;
        }

        let outcomes: Vec<JobOutcome> = run
            .outcomes
            .into_iter()
            .enumerate()
            .map(|(job_id, outcome)| outcome.unwrap_or(Err(JobError::Cancelled { job_id })))
            .collect();
        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        if failed > 0 {
            warn!(jobs = total, failed, "batch finished with failures");
        } else {
            info!(jobs = total, "batch finished");
        }
        Ok(outcomes)
    }

    /// Resolves `job` from the cache or parks it behind a running twin.
    /// Returns the job when it has to run.
    async fn admit(&self, mut job: Job, run: &mut BatchRun<'_>, cancel: &CancellationToken) -> Option<Job> {
        if cancel.is_cancelled() {
            if job.leader {
                run.release_followers(&job.fingerprint);
            }
            run.finish(job.id, Err(JobError::Cancelled { job_id: job.id }));
            return None;
        }
        if job.leader {
            if job.deadline_passed() {
                self.time_out(job, run);
                return None;
            }
            return Some(job);
        }

        let cached = self.cache.lock().await.get(&job.fingerprint);
        if let Some(result) = cached {
            StatsCounters::bump(&self.stats.cache_hits);
            job.state = JobState::Completed;
            run.finish(job.id, Ok(result));
            return None;
        }

        if let Some(followers) = run.inflight.get_mut(&job.fingerprint) {
            debug!(job = job.id, fingerprint = ?job.fingerprint, "parked behind identical job");
            followers.push(job);
            return None;
        }
        run.inflight.insert(job.fingerprint, Vec::new());
        job.leader = true;
        Some(job)
    }

    fn dispatch(&self, mut job: Job, running: &mut JoinSet<AttemptReport>, run: &mut BatchRun<'_>) {
        debug_assert_eq!(job.state, JobState::Queued);
        job.state = JobState::Running;
        job.attempts += 1;
        if job.deadline.is_none() {
            job.deadline = self.config.job_timeout().map(|budget| Instant::now() + budget);
        }
        StatsCounters::bump(&self.stats.codec_invocations);
        debug!(
            job = job.id,
            attempt = job.attempts,
            family = job.plan.family().name(),
            "dispatching"
        );

        let mut scratch = run.scratch_pool.pop().unwrap_or_default();
        let buffer = Arc::clone(&job.buffer);
        let plan = job.plan;
        let platform = Arc::clone(&self.platform);
        let threshold = self.config.platform_threshold_pixels;
        let deadline = job.deadline;

        running.spawn(async move {
            let handle = tokio::task::spawn_blocking(move || {
                let (result, platform_used) =
                    run_attempt(&buffer, &plan, platform.as_ref(), threshold, &mut scratch);
                (result, platform_used, scratch)
            });
            let joined = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        return AttemptReport {
                            job,
                            result: AttemptResult::TimedOut,
                            scratch: None,
                        };
                    }
                },
                None => handle.await,
            };
            match joined {
                Ok((result, platform_used, scratch)) => AttemptReport {
                    job,
                    result: AttemptResult::Finished {
                        result,
                        platform_used,
                    },
                    scratch: Some(scratch),
                },
                Err(err) => AttemptReport {
                    job,
                    result: AttemptResult::Panicked(panic_message(err)),
                    scratch: None,
                },
            }
        });
    }

    /// Applies the outcome of one attempt.
    async fn settle(&self, report: AttemptReport, run: &mut BatchRun<'_>, cancel: &CancellationToken) {
        let AttemptReport {
            mut job,
            result,
            scratch,
        } = report;
        if let Some(scratch) = scratch {
            run.scratch_pool.push(scratch);
        }

        let error = match result {
            AttemptResult::Finished {
                result: Ok(mut result),
                platform_used,
            } => {
                if platform_used {
                    StatsCounters::bump(&self.stats.platform_encodes);
                }
                if job.fallback_used {
                    result.optimizations.push(Optimization::Fallback {
                        from: job.original_plan.family(),
                    });
                }
                let stored = self.cache.lock().await.insert(job.fingerprint, result.clone());
                if !stored {
                    debug!(job = job.id, bytes = result.len(), "result larger than cache budget");
                }
                job.state = JobState::Completed;
                self.complete(job, result, run, cancel);
                return;
            }
            AttemptResult::Finished { result: Err(err), .. } => err,
            AttemptResult::Panicked(message) => {
                warn!(job = job.id, %message, "worker panicked");
                CodecError::WorkerPanicked(message)
            }
            AttemptResult::TimedOut => {
                self.time_out(job, run);
                return;
            }
        };

        if job.deadline_passed() {
            debug!(job = job.id, %error, "no budget left for another attempt");
            self.time_out(job, run);
            return;
        }
        if !error.is_deterministic() && job.retries < self.config.retry_limit {
            job.retries += 1;
            job.state = JobState::Queued;
            StatsCounters::bump(&self.stats.retries);
            debug!(job = job.id, retry = job.retries, %error, "retrying");
            run.queue.push_back(job);
            return;
        }
        if job.switch_to_fallback(error.clone()) {
            StatsCounters::bump(&self.stats.fallbacks);
            info!(job = job.id, %error, to = job.plan.family().name(), "falling back");
            run.queue.push_back(job);
            return;
        }

        warn!(job = job.id, attempts = job.attempts, %error, "job failed");
        let fingerprint = job.fingerprint;
        let id = job.id;
        run.release_followers(&fingerprint);
        run.finish(id, Err(job.into_failure(error)));
    }

    /// Reports `job` and every follower parked behind it as timed out.
    fn time_out(&self, mut job: Job, run: &mut BatchRun<'_>) {
        let budget = self.config.job_timeout().unwrap_or_default();
        warn!(job = job.id, attempts = job.attempts, ?budget, "job timed out");
        job.state = JobState::Failed;
        let followers = run.inflight.remove(&job.fingerprint).unwrap_or_default();
        for follower in followers {
            run.finish(
                follower.id,
                Err(JobError::TimedOut {
                    job_id: follower.id,
                    budget,
                }),
            );
        }
        run.finish(job.id, Err(JobError::TimedOut { job_id: job.id, budget }));
    }

    fn complete(&self, job: Job, result: EncodedResult, run: &mut BatchRun<'_>, cancel: &CancellationToken) {
        let followers = run.inflight.remove(&job.fingerprint).unwrap_or_default();
        for follower in followers {
            if cancel.is_cancelled() {
                run.finish(follower.id, Err(JobError::Cancelled { job_id: follower.id }));
            } else {
                StatsCounters::bump(&self.stats.cache_hits);
                run.finish(follower.id, Ok(result.clone()));
            }
        }
        if cancel.is_cancelled() {
            run.finish(job.id, Err(JobError::Cancelled { job_id: job.id }));
        } else {
            run.finish(job.id, Ok(result));
        }
    }
}

/// Runs `jobs` on a one-shot orchestrator.
pub async fn submit_batch(jobs: Vec<BatchJob>, config: OrchestratorConfig) -> Result<Vec<JobOutcome>, BatchError> {
    Orchestrator::new(config)?.submit_batch(jobs).await
}

/// Blocking form of [`submit_batch`] for callers without a runtime.
pub fn submit_batch_blocking(
    jobs: Vec<BatchJob>,
    config: OrchestratorConfig,
) -> Result<(Vec<JobOutcome>, OrchestratorStats), BatchError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_count.clamp(1, 4))
        .enable_time()
        .build()?;
    runtime.block_on(async {
        let orchestrator = Orchestrator::new(config)?;
        let outcomes = orchestrator.submit_batch(jobs).await?;
        Ok::<_, BatchError>((outcomes, orchestrator.stats()))
    })
}
