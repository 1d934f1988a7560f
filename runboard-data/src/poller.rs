//! Generic fetch-until-terminal poller with exponential backoff.
//!
//! The poller knows nothing about runs: callers hand it a fetch closure, a
//! completion predicate and an update callback. It returns exactly once, with
//! either a completed result or one [`PollError`].

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45 * 60);

/// Timing knobs for one poll operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollConfig {
    pub base_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f64,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_interval: DEFAULT_BASE_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Mutable timing state of a running poll.
///
/// Invariant: `base <= interval <= max`.
#[derive(Debug, Clone)]
pub struct PollState {
    interval: Duration,
    base: Duration,
    max: Duration,
    factor: f64,
    started_at: Instant,
    deadline: Instant,
}

impl PollState {
    pub fn new(config: &PollConfig) -> Self {
        let base = config.base_interval;
        let max = config.max_interval.max(base);
        let factor = if config.backoff_factor.is_finite() {
            config.backoff_factor.max(1.0)
        } else {
            DEFAULT_BACKOFF_FACTOR
        };
        let started_at = Instant::now();
        Self {
            interval: base,
            base,
            max,
            factor,
            started_at,
            deadline: started_at + config.timeout,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max
    }

    /// A successful fetch puts the interval back at base.
    pub fn on_success(&mut self) {
        self.interval = self.base;
    }

    /// Grow the interval after a failed fetch and return it.
    pub fn on_error(&mut self) -> Duration {
        self.interval = self.interval.mul_f64(self.factor).min(self.max);
        self.interval
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// How a single fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError<E> {
    /// Worth retrying after a backoff.
    #[error("{0}")]
    Transient(E),
    /// Ends the poll.
    #[error("{0}")]
    Fatal(E),
}

/// Why a poll ended without a completed result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError<E> {
    #[error("Polling timed out after {}s", .elapsed.as_secs())]
    Timeout { elapsed: Duration },

    #[error("Polling cancelled")]
    Cancelled,

    #[error("{0}")]
    Fetch(E),
}

impl<E> PollError<E> {
    /// Timeout and cancellation can simply be retried.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled)
    }
}

/// Drives fetch-and-check cycles for one resource.
#[derive(Debug, Clone)]
pub struct Poller {
    config: PollConfig,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(config: PollConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Fetch until `is_complete` holds, calling `on_update` after every
    /// successful fetch (including the first and the last).
    pub async fn poll_until_complete<T, E, F, Fut, C, U>(
        &self,
        fetch: F,
        is_complete: C,
        on_update: U,
    ) -> Result<T, PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError<E>>>,
        C: Fn(&T) -> bool,
        U: FnMut(&T),
        E: std::fmt::Display,
    {
        self.poll_with_retry_hook(fetch, is_complete, on_update, |_, _| {})
            .await
    }

    /// Like [`Poller::poll_until_complete`], additionally calling `on_retry`
    /// with each transient error and the wait before the next attempt.
    pub async fn poll_with_retry_hook<T, E, F, Fut, C, U, R>(
        &self,
        mut fetch: F,
        is_complete: C,
        mut on_update: U,
        mut on_retry: R,
    ) -> Result<T, PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError<E>>>,
        C: Fn(&T) -> bool,
        U: FnMut(&T),
        R: FnMut(&E, Duration),
        E: std::fmt::Display,
    {
        let mut state = PollState::new(&self.config);
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }
            if state.is_expired() {
                return Err(PollError::Timeout {
                    elapsed: state.elapsed(),
                });
            }

            attempt += 1;
            // One fetch at a time; it races only against cancel and the deadline.
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(state.remaining()) => {
                    return Err(PollError::Timeout { elapsed: state.elapsed() });
                }
                result = fetch() => result,
            };

            match outcome {
                Ok(result) => {
                    on_update(&result);
                    if is_complete(&result) {
                        debug!(attempt, elapsed_ms = state.elapsed().as_millis() as u64, "poll complete");
                        return Ok(result);
                    }
                    state.on_success();
                }
                Err(FetchError::Transient(e)) => {
                    let wait = state.on_error();
                    warn!(attempt, error = %e, retry_in_ms = wait.as_millis() as u64, "poll fetch failed, backing off");
                    on_retry(&e, wait);
                }
                Err(FetchError::Fatal(e)) => {
                    warn!(attempt, error = %e, "poll fetch failed fatally");
                    return Err(PollError::Fetch(e));
                }
            }

            let wait = state.interval().min(state.remaining());
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}
