//! Batch bounds: an optional deadline plus a shared abort flag.
//!
//! Batches check [`BatchControl::should_stop`] between items. A call that is
//! already in flight, including its retry backoff, always completes.

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Limits applied to every batch run, loaded from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchLimits {
  pub max_duration_secs: Option<u64>,
}

impl BatchLimits {
  /// A fresh control for one batch, with the deadline measured from now.
  pub fn control(&self) -> BatchControl {
    match self.max_duration_secs {
      Some(secs) => BatchControl::with_max_duration(Duration::from_secs(secs)),
      None => BatchControl::default(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct BatchControl {
  deadline: Option<Instant>,
  aborted:  Arc<AtomicBool>,
}

impl BatchControl {
  pub fn with_max_duration(max: Duration) -> Self {
    Self { deadline: Some(Instant::now() + max), aborted: Arc::default() }
  }

  /// Ask the batch holding a clone of this control to stop at its next
  /// checkpoint.
  pub fn abort(&self) { self.aborted.store(true, Ordering::SeqCst); }

  pub fn should_stop(&self) -> bool {
    self.aborted.load(Ordering::SeqCst)
      || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
  }
}
