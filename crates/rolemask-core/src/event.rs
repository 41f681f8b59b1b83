//! Outbox events.
//!
//! Side effects of subject lifecycle changes are not run inline. The store
//! records an event in the same transaction as the change, and the sync
//! service consumes it afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SubjectEvent {
  /// A subject was added; it needs a default configuration and possibly a
  /// color rule pass.
  Created { subject_id: Uuid },
}

impl SubjectEvent {
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Created { .. } => "created",
    }
  }
}

/// A queued, not yet consumed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
  pub event_id:    Uuid,
  pub event:       SubjectEvent,
  pub recorded_at: DateTime<Utc>,
}
