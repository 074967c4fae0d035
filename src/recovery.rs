// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Retry policy for collector transports
//!
//! Retries are opt-in per collector and filtered by a predicate, so only
//! transient failures (typically timeouts) are attempted again.

use std::future::Future;
use std::time::{Duration, Instant};

/// Retry strategy for operations
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RetryStrategy {
    /// No retries
    #[default]
    None,
    /// Fixed number of retries with constant delay
    Fixed {
        /// Maximum number of retry attempts
        max_retries: u32,
        /// Delay between retries
        delay: Duration,
    },
    /// Exponential backoff
    ExponentialBackoff {
        /// Maximum number of retry attempts
        max_retries: u32,
        /// Initial delay
        initial_delay: Duration,
        /// Maximum delay
        max_delay: Duration,
        /// Multiplier for each attempt
        multiplier: f64,
    },
}

impl RetryStrategy {
    /// Calculate delay for a given retry number (0-indexed)
    ///
    /// Returns None if no more retries should be attempted
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed { max_retries, delay } => (attempt < *max_retries).then_some(*delay),
            Self::ExponentialBackoff {
                max_retries,
                initial_delay,
                max_delay,
                multiplier,
            } => {
                if attempt < *max_retries {
                    let delay_ms =
                        initial_delay.as_millis() as f64 * multiplier.powi(attempt as i32);
                    Some(Duration::from_millis(delay_ms as u64).min(*max_delay))
                } else {
                    None
                }
            }
        }
    }

    /// Maximum number of retries (not counting the first attempt)
    pub fn max_retries(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Fixed { max_retries, .. } | Self::ExponentialBackoff { max_retries, .. } => {
                *max_retries
            }
        }
    }

    /// Create a fixed retry strategy
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self::Fixed { max_retries, delay }
    }

    /// Create an exponential backoff strategy
    pub fn exponential(max_retries: u32, initial_delay: Duration) -> Self {
        Self::ExponentialBackoff {
            max_retries,
            initial_delay,
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

/// Outcome of a retried operation
#[derive(Debug, Clone)]
pub struct RetryOutcome<T, E> {
    /// Final result
    pub result: Result<T, E>,
    /// Number of attempts made (>= 1)
    pub attempts: u32,
    /// Total time spent, sleeps included
    pub total_duration: Duration,
}

/// Run an async operation, retrying failures accepted by `should_retry`
///
/// The operation receives the 0-indexed attempt number. Errors rejected by
/// the predicate are returned immediately without further attempts.
pub async fn with_retry<T, E, F, Fut, P>(
    strategy: &RetryStrategy,
    should_retry: P,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let start = Instant::now();
    let mut attempt = 0;
    loop {
        let result = operation(attempt).await;
        let delay = match &result {
            Err(e) if should_retry(e) => strategy.delay_for_attempt(attempt),
            _ => None,
        };
        match delay {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            None => {
                return RetryOutcome {
                    result,
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                }
            }
        }
    }
}
