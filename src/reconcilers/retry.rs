// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry and backoff policies.
//!
//! - [`retry_api_call`] retries transient Kubernetes API errors (429, 5xx) in-process.
//! - [`http_backoff`] paces in-process retries of Cloudflare API requests.
//! - [`requeue_backoff`] computes the controller requeue delay after consecutive
//!   transient reconcile failures.

use anyhow::Result;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Maximum total time to spend retrying (5 minutes)
const MAX_ELAPSED_TIME_SECS: u64 = 300;

/// Initial retry interval (100ms)
const INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between retries (30 seconds)
const MAX_INTERVAL_SECS: u64 = 30;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// HTTP retry initial interval (50ms) - faster than Kubernetes API
const HTTP_INITIAL_INTERVAL_MILLIS: u64 = 50;

/// HTTP retry maximum interval (10 seconds) - shorter than Kubernetes API
const HTTP_MAX_INTERVAL_SECS: u64 = 10;

/// HTTP retry maximum elapsed time (2 minutes) - shorter than Kubernetes API
pub const HTTP_MAX_ELAPSED_TIME_SECS: u64 = 120;

/// Requeue delay after the first transient reconcile failure
const REQUEUE_BASE_SECS: u64 = 5;

/// Upper bound for the transient failure requeue delay (5 minutes)
const REQUEUE_MAX_SECS: u64 = 300;

/// Exponential backoff with ±`randomization_factor` jitter.
pub struct ExponentialBackoff {
    pub current_interval: Duration,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// `None` retries forever.
    pub max_elapsed_time: Option<Duration>,
    pub multiplier: f64,
    pub randomization_factor: f64,
    start_time: Instant,
}

impl ExponentialBackoff {
    fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            start_time: Instant::now(),
        }
    }

    /// Next delay, or `None` once `max_elapsed_time` has passed.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self
            .max_elapsed_time
            .is_some_and(|max| self.start_time.elapsed() >= max)
        {
            return None;
        }

        let interval = self.current_interval;
        let grown = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(grown).min(self.max_interval);

        Some(self.apply_jitter(interval))
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let min = secs - delta;
        let max = secs + delta;

        let mut rng = rand::thread_rng();
        let jittered = rng.gen_range(min..=max);

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff for Kubernetes API calls made outside the controller loop (status
/// writes, finalizer patches): 100ms doubling to 30s, for at most 5 minutes.
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Backoff for Cloudflare API requests: 50ms doubling to 10s, for at most 2 minutes.
///
/// A request still failing after that is handed back to the engine as a transient
/// reconcile failure and retried on the requeue schedule instead.
#[must_use]
pub fn http_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(HTTP_INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(HTTP_MAX_INTERVAL_SECS),
        Some(Duration::from_secs(HTTP_MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Requeue delay after `failure_count` consecutive transient failures.
///
/// Starts at 5 seconds, doubles per failure and is capped at 5 minutes, with ±10%
/// jitter applied to the result. A count of zero is treated as one.
///
/// # Retry Schedule
///
/// 1. 5s
/// 2. 10s
/// 3. 20s
/// 4. 40s
/// 5. 80s
/// 6. 160s
/// 7. 300s (capped)
#[must_use]
pub fn requeue_backoff(failure_count: u32) -> Duration {
    let exponent = failure_count.saturating_sub(1).min(16);
    let secs = REQUEUE_BASE_SECS
        .saturating_mul(1u64 << exponent)
        .min(REQUEUE_MAX_SECS);

    let backoff = ExponentialBackoff::new(
        Duration::from_secs(secs),
        Duration::from_secs(REQUEUE_MAX_SECS),
        None,
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    );
    backoff.apply_jitter(Duration::from_secs(secs))
}

/// Retry a Kubernetes API call on 429, 5xx and connection errors.
///
/// `operation_name` labels the log lines, e.g. `"get R2Bucket default/assets"`.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last error once [`default_backoff`]
/// gives up.
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = default_backoff();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt,
                        "Kubernetes API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_retryable_error(&err) {
            debug!(operation = operation_name, error = %err, "Kubernetes API call failed");
            return Err(err.into());
        }

        let Some(delay) = backoff.next_backoff() else {
            error!(
                operation = operation_name,
                attempt,
                error = %err,
                "Kubernetes API still failing, giving up"
            );
            return Err(anyhow::anyhow!(
                "{operation_name} failed after {attempt} attempts: {err}"
            ));
        };
        warn!(
            operation = operation_name,
            attempt,
            retry_in = ?delay,
            error = %err,
            "Kubernetes API call failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Throttling, server errors and connection failures are worth retrying.
fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(status) => status.code == 429 || (500..600).contains(&status.code),
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
