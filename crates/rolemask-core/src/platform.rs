//! The chat platform capability the orchestrator drives.
//!
//! Implementations are bound to a single guild. Every call may fail with
//! [`PlatformError::RateLimited`], which carries the platform's reset hint.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  color::Color,
  role::{ExternalRole, RoleId},
};

#[derive(Debug, Clone, Error)]
pub enum PlatformError {
  /// The platform asked us to back off. `retry_after` is the raw hint as
  /// reported; its unit is interpreted by the retry policy.
  #[error("rate limited, retry after {retry_after}")]
  RateLimited { retry_after: f64 },

  #[error("platform returned {status}: {message}")]
  Status { status: u16, message: String },

  #[error("transport error: {0}")]
  Transport(String),

  #[error("could not decode platform response: {0}")]
  Decode(String),
}

impl PlatformError {
  pub fn is_rate_limited(&self) -> bool { matches!(self, Self::RateLimited { .. }) }
}

/// Fields to change on a role; `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none", with = "color_int")]
  pub color: Option<Color>,
}

impl RolePatch {
  pub fn rename(name: impl Into<String>) -> Self {
    Self { name: Some(name.into()), color: None }
  }

  pub fn recolor(color: Color) -> Self { Self { name: None, color: Some(color) } }

  pub fn is_empty(&self) -> bool { self.name.is_none() && self.color.is_none() }
}

/// The platform's wire form for colors is a plain integer.
mod color_int {
  use serde::{Deserialize, Deserializer, Serializer};

  use crate::color::Color;

  pub fn serialize<S: Serializer>(value: &Option<Color>, s: S) -> Result<S::Ok, S::Error> {
    match value {
      Some(c) => s.serialize_u32(c.value()),
      None => s.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Color>, D::Error> {
    Ok(Option::<u32>::deserialize(d)?.map(Color::from_rgb))
  }
}

/// A single entry of a bulk reposition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePosition {
  pub id:       RoleId,
  pub position: u32,
}

/// Role operations on one guild.
pub trait RoleClient: Send + Sync {
  /// All roles, in platform order. With `use_cache`, a recent snapshot may be
  /// returned.
  fn list_roles(
    &self,
    use_cache: bool,
  ) -> impl Future<Output = Result<Vec<ExternalRole>, PlatformError>> + Send + '_;

  fn patch_role(
    &self,
    role_id: RoleId,
    patch: RolePatch,
  ) -> impl Future<Output = Result<(), PlatformError>> + Send + '_;

  fn reposition_roles(
    &self,
    positions: Vec<RolePosition>,
  ) -> impl Future<Output = Result<(), PlatformError>> + Send + '_;

  /// Drop any cached roleset so the next `list_roles` sees fresh state.
  fn invalidate_role_cache(&self);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn patch_serialises_only_present_fields() {
    let json = serde_json::to_value(RolePatch::rename("abc")).unwrap();
    assert_eq!(json, serde_json::json!({ "name": "abc" }));

    let json = serde_json::to_value(RolePatch::recolor(Color::from_rgb(0x00ff00))).unwrap();
    assert_eq!(json, serde_json::json!({ "color": 65280 }));
  }
}
