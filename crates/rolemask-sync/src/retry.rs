//! Rate-limit aware retry wrapper for platform calls.
//!
//! Only [`PlatformError::RateLimited`] is retried. Every other failure is
//! returned to the caller on the first attempt.

use std::{future::Future, time::Duration};

use rolemask_core::platform::PlatformError;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

fn default_max_attempts() -> u32 { 3 }
fn default_safety_margin_secs() -> f64 { 1.0 }
fn default_min_delay_secs() -> f64 { 1.0 }
fn default_millis_threshold() -> f64 { 60.0 }
fn default_max_delay_secs() -> f64 { 3600.0 }

/// How rate-limited calls are retried.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
  /// Total attempts, including the first one.
  #[serde(default = "default_max_attempts")]
  pub max_attempts:       u32,
  /// Added to every reset hint.
  #[serde(default = "default_safety_margin_secs")]
  pub safety_margin_secs: f64,
  /// Lower bound on any computed delay.
  #[serde(default = "default_min_delay_secs")]
  pub min_delay_secs:     f64,
  /// Reset hints above this value are read as milliseconds.
  #[serde(default = "default_millis_threshold")]
  pub millis_threshold:   f64,
  /// Upper bound on any computed delay.
  #[serde(default = "default_max_delay_secs")]
  pub max_delay_secs:     f64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts:       default_max_attempts(),
      safety_margin_secs: default_safety_margin_secs(),
      min_delay_secs:     default_min_delay_secs(),
      millis_threshold:   default_millis_threshold(),
      max_delay_secs:     default_max_delay_secs(),
    }
  }
}

impl RetryPolicy {
  /// Delay before the next attempt, given the platform's reset hint.
  pub fn delay_for(&self, retry_after: f64) -> Duration {
    let hint = if retry_after.is_finite() { retry_after.max(0.0) } else { 0.0 };
    let secs = if hint > self.millis_threshold { hint / 1000.0 } else { hint };
    let delay = (secs + self.safety_margin_secs).max(self.min_delay_secs);
    let ceiling = if self.max_delay_secs.is_finite() {
      self.max_delay_secs
    } else {
      default_max_delay_secs()
    };
    // The ceiling wins over the floor.
    let delay = delay.min(ceiling).max(0.0);
    Duration::try_from_secs_f64(delay).unwrap_or(Duration::ZERO)
  }
}

// ─── Sleeper ─────────────────────────────────────────────────────────────────

/// Suspends the current task between attempts.
pub trait Sleeper: Send + Sync {
  fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send + '_;
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
  async fn sleep(&self, duration: Duration) { tokio::time::sleep(duration).await }
}

// ─── Wrapper ─────────────────────────────────────────────────────────────────

/// Run `op` until it succeeds, fails with something other than a rate
/// limit, or `policy.max_attempts` is used up.
pub async fn call_with_retry<T, F, Fut, Z>(
  policy:  &RetryPolicy,
  sleeper: &Z,
  label:   &str,
  mut op:  F,
) -> Result<T, PlatformError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, PlatformError>>,
  Z: Sleeper,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut attempt = 1;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(PlatformError::RateLimited { retry_after }) if attempt < max_attempts => {
        let delay = policy.delay_for(retry_after);
        warn!(
          call = label,
          attempt,
          retry_after,
          delay_secs = delay.as_secs_f64(),
          "rate limited; backing off"
        );
        sleeper.sleep(delay).await;
        attempt += 1;
      }
      Err(err) => {
        if err.is_rate_limited() {
          error!(call = label, attempts = attempt, "rate limited; giving up");
        }
        return Err(err);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
  };

  use super::*;

  #[derive(Default)]
  struct RecordingSleeper(Mutex<Vec<Duration>>);

  impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) { self.0.lock().unwrap().push(duration); }
  }

  fn rate_limited(retry_after: f64) -> PlatformError { PlatformError::RateLimited { retry_after } }

  #[test]
  fn delay_reads_large_hints_as_milliseconds() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(2.0), Duration::from_secs(3));
    assert_eq!(policy.delay_for(1500.0), Duration::from_secs_f64(2.5));
    // Exactly at the threshold is still seconds.
    assert_eq!(policy.delay_for(60.0), Duration::from_secs(61));
  }

  #[test]
  fn delay_is_floored_and_never_negative() {
    let policy = RetryPolicy { safety_margin_secs: 0.0, min_delay_secs: 0.5, ..Default::default() };
    assert_eq!(policy.delay_for(0.1), Duration::from_secs_f64(0.5));
    assert_eq!(policy.delay_for(-5.0), Duration::from_secs_f64(0.5));
    assert_eq!(policy.delay_for(f64::NAN), Duration::from_secs_f64(0.5));
  }

  #[test]
  fn huge_hints_are_capped() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(1e30), Duration::from_secs(3600));
    assert_eq!(policy.delay_for(f64::MAX), Duration::from_secs(3600));

    let policy = RetryPolicy { max_delay_secs: f64::INFINITY, ..Default::default() };
    assert_eq!(policy.delay_for(1e30), Duration::from_secs(3600));

    let policy = RetryPolicy { max_delay_secs: 10.0, min_delay_secs: 30.0, ..Default::default() };
    assert_eq!(policy.delay_for(0.0), Duration::from_secs(10));
  }

  #[tokio::test]
  async fn succeeds_on_third_attempt_after_two_rate_limits() {
    let sleeper = RecordingSleeper::default();
    let calls = AtomicU32::new(0);

    let result = call_with_retry(&RetryPolicy::default(), &sleeper, "patch", || {
      let n = calls.fetch_add(1, Ordering::SeqCst);
      async move { if n < 2 { Err(rate_limited(0.25)) } else { Ok(n) } }
    })
    .await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let slept = sleeper.0.lock().unwrap().clone();
    assert_eq!(slept.len(), 2);
    assert!(slept.iter().all(|d| *d >= Duration::from_secs(1)));
  }

  #[tokio::test]
  async fn gives_up_after_max_attempts() {
    let sleeper = RecordingSleeper::default();
    let calls = AtomicU32::new(0);

    let result: Result<(), _> = call_with_retry(&RetryPolicy::default(), &sleeper, "patch", || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(rate_limited(5.0)) }
    })
    .await;

    assert!(result.unwrap_err().is_rate_limited());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.0.lock().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn other_errors_are_not_retried() {
    let sleeper = RecordingSleeper::default();
    let calls = AtomicU32::new(0);

    let result: Result<(), _> = call_with_retry(&RetryPolicy::default(), &sleeper, "patch", || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(PlatformError::Transport("connection reset".into())) }
    })
    .await;

    assert!(matches!(result, Err(PlatformError::Transport(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(sleeper.0.lock().unwrap().is_empty());
  }
}
