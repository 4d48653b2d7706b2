//! Bounded exponential backoff for Realmgate's network-bound stages.
//!
//! Token exchange and realm directory queries talk to remote services
//! that sometimes hiccup. This crate retries them a bounded number of
//! times, waiting a little longer between each attempt, and puts a hard
//! timeout on every attempt so a network partition can't hang the
//! pipeline.
//!
//! # Which errors are retried?
//!
//! Only errors that say so. Operation errors implement [`Transient`];
//! `is_transient() == false` stops the loop immediately with
//! [`RetryError::Permanent`]. A rejected password is never worth a
//! second try, a dropped connection usually is.
//!
//! # Integration
//!
//! ```ignore
//! let token = retry(&config, "token exchange", |attempt| {
//!     provider.exchange_token(&credentials)
//! })
//! .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Implemented by operation errors to tell [`retry`] whether another
/// attempt could succeed.
pub trait Transient {
    /// `true` for failures caused by the environment (network, service
    /// overload) rather than by the request itself.
    fn is_transient(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Retry budget and pacing for one kind of operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one. 1 = no retries.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Growth factor applied to the delay after every retry.
    pub multiplier: f64,
    /// Upper bound for a single delay (before jitter).
    pub max_delay: Duration,
    /// Random extra delay (0..=max) added to each wait so that many
    /// clients failing together don't retry in lockstep.
    pub max_jitter: Duration,
    /// Hard limit for a single attempt. An attempt that runs longer is
    /// abandoned and counts as a transient failure.
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(8),
            max_jitter: Duration::from_millis(100),
            attempt_timeout: Duration::from_secs(20),
        }
    }
}

impl RetryConfig {
    /// Hard cap on attempts, whatever the caller asks for.
    pub const MAX_ATTEMPTS: u32 = 10;
    /// Shortest per-attempt timeout accepted.
    pub const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);
    /// Longest per-attempt timeout accepted.
    pub const MAX_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Default pacing with a specific attempt budget.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Same config without jitter. Delays become fully deterministic.
    pub fn without_jitter(mut self) -> Self {
        self.max_jitter = Duration::ZERO;
        self
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`retry`]. Rules:
    /// - `max_attempts` clamped to `1..=MAX_ATTEMPTS`.
    /// - `multiplier` below 1.0 (or NaN) becomes 1.0.
    /// - `max_delay` is raised to at least `initial_delay`.
    /// - `attempt_timeout` clamped to
    ///   `MIN_ATTEMPT_TIMEOUT..=MAX_ATTEMPT_TIMEOUT`.
    pub fn validated(mut self) -> Self {
        if self.max_attempts == 0 || self.max_attempts > Self::MAX_ATTEMPTS {
            warn!(
                requested = self.max_attempts,
                max = Self::MAX_ATTEMPTS,
                "max_attempts out of range, clamping"
            );
            self.max_attempts = self.max_attempts.clamp(1, Self::MAX_ATTEMPTS);
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            self.multiplier = 1.0;
        }
        if self.max_delay < self.initial_delay {
            self.max_delay = self.initial_delay;
        }
        self.attempt_timeout = self
            .attempt_timeout
            .clamp(Self::MIN_ATTEMPT_TIMEOUT, Self::MAX_ATTEMPT_TIMEOUT);
        self
    }

    /// Delay (without jitter) before retry number `retry` (1-based: the
    /// wait between attempt 1 and attempt 2 is `delay_for(1)`).
    ///
    /// `initial_delay * multiplier^(retry - 1)`, capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exp = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exp);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Hands out the waits for one run of an operation, then runs dry.
///
/// ```text
/// attempt 1 ─ fail ─ next_delay() = Some(d1) ─ attempt 2 ─ fail ─
/// next_delay() = Some(d2) ─ attempt 3 ─ fail ─ next_delay() = None
/// ```
#[derive(Debug)]
pub struct Backoff {
    config: RetryConfig,
    retries: u32,
}

impl Backoff {
    /// Starts a fresh backoff sequence. The config is validated first.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: config.validated(),
            retries: 0,
        }
    }

    /// The wait before the next attempt, or `None` once the attempt
    /// budget is used up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries + 1 >= self.config.max_attempts {
            return None;
        }
        self.retries += 1;
        let base = self.config.delay_for(self.retries);
        Some(base + self.jitter())
    }

    /// Number of delays handed out so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// The validated config this sequence runs on.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn jitter(&self) -> Duration {
        let max_us =
            u64::try_from(self.config.max_jitter.as_micros()).unwrap_or(u64::MAX);
        if max_us == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::rng().random_range(0..=max_us))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why [`retry`] gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The operation failed with an error that retrying can't fix.
    #[error("failed on attempt {attempt}: {source}")]
    Permanent {
        attempt: u32,
        #[source]
        source: E,
    },

    /// Every attempt failed transiently. `source` is the last failure.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// Every attempt failed and the last one hit the per-attempt timeout.
    #[error("gave up after {attempts} attempts: last attempt timed out after {timeout:?}")]
    TimedOut { attempts: u32, timeout: Duration },
}

impl<E> RetryError<E> {
    /// How many attempts were made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Permanent { attempt, .. } => *attempt,
            Self::Exhausted { attempts, .. } | Self::TimedOut { attempts, .. } => {
                *attempts
            }
        }
    }

    /// The last operation error, if the last attempt produced one.
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Permanent { source, .. } | Self::Exhausted { source, .. } => {
                Some(source)
            }
            Self::TimedOut { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// retry()
// ---------------------------------------------------------------------------

/// Runs `operation` until it succeeds, fails permanently, or the attempt
/// budget in `config` is spent.
///
/// `operation` receives the 1-based attempt number. `label` names the
/// operation in log events. Each attempt is bounded by
/// `config.attempt_timeout`; waits between attempts follow
/// [`RetryConfig::delay_for`] plus jitter.
///
/// # Errors
/// See [`RetryError`].
pub async fn retry<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    E: Transient + fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = Backoff::new(config.clone());
    let timeout = backoff.config().attempt_timeout;
    let max_attempts = backoff.config().max_attempts;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let last_error = match time::timeout(timeout, operation(attempt)).await {
            Ok(Ok(value)) => {
                if attempt > 1 {
                    debug!(operation = label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Ok(Err(e)) if !e.is_transient() => {
                debug!(operation = label, attempt, error = %e, "permanent failure");
                return Err(RetryError::Permanent {
                    attempt,
                    source: e,
                });
            }
            Ok(Err(e)) => Some(e),
            Err(_) => None,
        };

        let Some(delay) = backoff.next_delay() else {
            warn!(operation = label, attempts = attempt, "retry budget exhausted");
            return Err(match last_error {
                Some(source) => RetryError::Exhausted {
                    attempts: attempt,
                    source,
                },
                None => RetryError::TimedOut {
                    attempts: attempt,
                    timeout,
                },
            });
        };

        match &last_error {
            Some(e) => warn!(
                operation = label,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %e,
                "attempt failed, backing off"
            ),
            None => warn!(
                operation = label,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                timeout_ms = timeout.as_millis() as u64,
                "attempt timed out, backing off"
            ),
        }
        time::sleep(delay).await;
    }
}
