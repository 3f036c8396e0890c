//! Quota-aware execution of independent upstream requests.
//!
//! A [`Scheduler`] takes a list of [`Job`]s, each carrying a precomputed cost,
//! and turns them into calls that respect two ceilings:
//!
//! - before anything is sent, the run is checked as a whole ([`QuotaPolicy::plan`]);
//!   a run that would exceed either ceiling is refused and no call is made,
//! - jobs are grouped into batches whose summed cost fits the per-minute ceiling,
//!   with a fixed pause between batches and none before the first.
//!
//! Every call sent is charged to a [`SpendLedger`] kept for the scheduler's
//! lifetime. A run starts only once the last hour's spending leaves room for
//! its whole cost, and its first batch only once the last minute's spending
//! leaves room for that batch, so back-to-back runs on one scheduler stay under
//! the same ceilings as a single run.
//!
//! Each call is retried on transient failures ([`RetryPolicy`]); a job that still
//! fails is recorded in [`Outcome::failed`] and the run moves on. Every pause
//! (batch wait, backoff, optional per-call pacing) ends early when the
//! scheduler's [`CancellationToken`] fires.

pub mod quota;
pub mod retry;

use std::{
    future::Future,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{models::LocationId, providers::ProviderError};

pub use quota::{BatchPlan, HOUR, MINUTE, QuotaBreach, QuotaPolicy, SpendLedger, call_cost};
pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The pre-flight check refused the run. No request was sent.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(#[from] QuotaBreach),

    /// The cancellation token fired before the run finished.
    #[error("run cancelled after {finished} of {total} requests")]
    Cancelled { finished: usize, total: usize },
}

/// One unit of upstream work.
#[derive(Debug, Clone, PartialEq)]
pub struct Job<R> {
    /// Location the results belong to. Returned with every result.
    pub id: LocationId,
    pub cost: u64,
    pub request: R,
}

/// A job that produced a value.
#[derive(Debug)]
pub struct Completed<R, T> {
    pub id: LocationId,
    pub request: R,
    pub value: T,
}

/// A job given up on, and why.
#[derive(Debug)]
pub struct JobFailure<R> {
    pub id: LocationId,
    pub request: R,
    pub error: ProviderError,
    pub attempts: u32,
}

/// Results of a run, in submission order.
#[derive(Debug)]
pub struct Outcome<R, T> {
    pub completed: Vec<Completed<R, T>>,
    pub failed: Vec<JobFailure<R>>,
}

impl<R, T> Default for Outcome<R, T> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<R, T> Outcome<R, T> {
    /// No job failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

struct Interrupted;

pub struct Scheduler {
    quota: QuotaPolicy,
    retry: RetryPolicy,
    pacer: Option<DefaultDirectRateLimiter>,
    cancel: CancellationToken,
    ledger: Mutex<SpendLedger>,
}

impl Scheduler {
    pub fn new(quota: QuotaPolicy, retry: RetryPolicy) -> Self {
        Self {
            quota,
            retry,
            pacer: None,
            cancel: CancellationToken::new(),
            ledger: Mutex::new(SpendLedger::default()),
        }
    }

    /// Spaces consecutive calls at least `interval` apart. A zero interval disables pacing.
    pub fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacer = Quota::with_period(interval)
            .map(|q| RateLimiter::direct(q.allow_burst(nonzero!(1u32))));
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts the run at the next pause or call boundary.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn quota(&self) -> &QuotaPolicy {
        &self.quota
    }

    /// Cost sent upstream by this scheduler within the last hour.
    pub fn spent_last_hour(&self) -> u64 {
        let now = Instant::now();
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.prune(now);
        ledger.spent_within(now, HOUR)
    }

    fn charge(&self, cost: u64) {
        let now = Instant::now();
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.prune(now);
        ledger.charge(now, cost);
    }

    /// Waits until `cost` more fits under `ceiling` within `window`.
    async fn wait_for_room(&self, cost: u64, window: Duration, ceiling: u64) -> Result<(), Interrupted> {
        loop {
            let now = Instant::now();
            let free_at = {
                let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
                ledger.prune(now);
                ledger.free_at(now, window, ceiling.saturating_sub(cost))
            };
            if free_at <= now {
                return Ok(());
            }
            let wait = free_at - now;
            info!(
                cost,
                ceiling,
                window_secs = window.as_secs(),
                wait_secs = wait.as_secs(),
                "Waiting for quota to free up"
            );
            self.pause(wait).await?;
        }
    }

    /// Pre-flight plan for a list of jobs, without running them.
    pub fn plan<R>(&self, jobs: &[Job<R>]) -> Result<BatchPlan, ScheduleError> {
        let costs: Vec<u64> = jobs.iter().map(|j| j.cost).collect();
        Ok(self.quota.plan(&costs)?)
    }

    /// Runs every job through `call`.
    ///
    /// `call` receives a clone of the job's request. Results are re-associated
    /// through the job id, never through position in the upstream response.
    pub async fn run<R, T, F, Fut>(&self, jobs: Vec<Job<R>>, mut call: F) -> Result<Outcome<R, T>, ScheduleError>
    where
        R: Clone,
        F: FnMut(R) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let plan = self.plan(&jobs)?;
        let total = jobs.len();
        let first_batch_cost: u64 = plan
            .batches
            .first()
            .map(|batch| jobs[batch.clone()].iter().map(|j| j.cost).sum())
            .unwrap_or(0);
        info!(
            jobs = total,
            batches = plan.batches.len(),
            total_cost = plan.total_cost,
            "Starting scheduled run"
        );

        let mut outcome = Outcome::default();
        if plan.batches.is_empty() {
            return Ok(outcome);
        }
        let interrupted = |_| ScheduleError::Cancelled { finished: 0, total };
        self.wait_for_room(plan.total_cost, HOUR, self.quota.per_hour)
            .await
            .map_err(interrupted)?;
        self.wait_for_room(first_batch_cost, MINUTE, self.quota.per_minute)
            .await
            .map_err(interrupted)?;

        let mut jobs = jobs.into_iter();
        for (n, batch) in plan.batches.iter().enumerate() {
            let finished = outcome.completed.len() + outcome.failed.len();
            if n > 0 {
                info!(
                    batch = n + 1,
                    wait_secs = self.quota.batch_wait.as_secs(),
                    "Waiting before next batch"
                );
                self.pause(self.quota.batch_wait)
                    .await
                    .map_err(|_| ScheduleError::Cancelled { finished, total })?;
            }

            for job in jobs.by_ref().take(batch.len()) {
                let finished = outcome.completed.len() + outcome.failed.len();
                let result = self
                    .execute(&job, &mut call)
                    .await
                    .map_err(|_| ScheduleError::Cancelled { finished, total })?;
                match result {
                    Ok(value) => outcome.completed.push(Completed {
                        id: job.id,
                        request: job.request,
                        value,
                    }),
                    Err((error, attempts)) => {
                        warn!(id = %job.id, attempts, error = %error, "Request failed, skipping");
                        outcome.failed.push(JobFailure {
                            id: job.id,
                            request: job.request,
                            error,
                            attempts,
                        });
                    }
                }
            }
        }

        info!(
            completed = outcome.completed.len(),
            failed = outcome.failed.len(),
            "Scheduled run finished"
        );
        Ok(outcome)
    }

    /// One job with retries. The inner `Err` is the last error and the number of attempts.
    async fn execute<R, T, F, Fut>(
        &self,
        job: &Job<R>,
        call: &mut F,
    ) -> Result<Result<T, (ProviderError, u32)>, Interrupted>
    where
        R: Clone,
        F: FnMut(R) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempts = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(Interrupted);
            }
            if let Some(pacer) = &self.pacer {
                tokio::select! {
                    _ = pacer.until_ready() => {}
                    _ = self.cancel.cancelled() => return Err(Interrupted),
                }
            }

            attempts += 1;
            debug!(id = %job.id, attempt = attempts, cost = job.cost, "Sending request");
            self.charge(job.cost);
            match call(job.request.clone()).await {
                Ok(value) => return Ok(Ok(value)),
                Err(error) if attempts <= self.retry.max_retries && self.retry.is_retryable(&error) => {
                    let delay = self.retry.delay_for(attempts - 1);
                    warn!(
                        id = %job.id,
                        attempt = attempts,
                        wait_secs = delay.as_secs_f64(),
                        error = %error,
                        "Transient failure, backing off"
                    );
                    self.pause(delay).await?;
                }
                Err(error) => return Ok(Err((error, attempts))),
            }
        }
    }

    async fn pause(&self, delay: Duration) -> Result<(), Interrupted> {
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = self.cancel.cancelled() => Err(Interrupted),
        }
    }
}
