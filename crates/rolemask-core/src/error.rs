//! Error types for `rolemask-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("minimum characters before a divider must be at least 1 when dividers are selected")]
  MissingDividerWidth,

  #[error("invalid color {0:?}: expected #RRGGBB")]
  InvalidColor(String),

  #[error("invalid random key: must be 16 alphanumeric characters")]
  InvalidRandomKey,

  #[error("invalid format: {0}")]
  InvalidFormat(String),

  #[error("custom name may only contain letters, numbers, and selected dividers")]
  InvalidCustomName,

  #[error("unknown obfuscation method: {0:?}")]
  UnknownMethod(String),

  #[error("invalid color rule pattern {pattern:?}: {reason}")]
  InvalidPattern { pattern: String, reason: String },

  #[error("unknown subject kind: {0:?}")]
  UnknownSubjectKind(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
