//! Subjects: the internal identities whose names are concealed.
//!
//! A subject is either a group or a state. Its real name never needs to
//! appear on the chat platform unless its configuration opts out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of identity a subject represents.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubjectKind {
  Group,
  State,
}

/// An internal identity eligible for name obfuscation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  pub kind:       SubjectKind,
  /// The real, internal name. Never shown externally unless opted out.
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

impl Subject {
  /// The key an [`ObfuscationConfig`](crate::config::ObfuscationConfig) is
  /// attached under.
  pub fn key(&self) -> SubjectKey {
    match self.kind {
      SubjectKind::Group => SubjectKey::Group(self.subject_id),
      SubjectKind::State => SubjectKey::State(self.name.clone()),
    }
  }
}

/// What a configuration belongs to: a group by id, or a state by name.
///
/// Exactly one is ever set; the enum makes "both" and "neither"
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SubjectKey {
  Group(Uuid),
  State(String),
}

/// Input for creating a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubject {
  pub kind: SubjectKind,
  pub name: String,
}
