//! External roles and point-in-time rolesets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Platform role identifier (a snowflake).
pub type RoleId = u64;

/// A role as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRole {
  pub id:       RoleId,
  pub name:     String,
  /// RGB integer; `0` means unset.
  pub color:    u32,
  pub position: u32,
}

/// An immutable snapshot of the guild's roles with name and id lookup.
///
/// When several roles share a name, lookup by name returns the first one in
/// snapshot order.
#[derive(Debug, Clone, Default)]
pub struct RoleSet {
  roles:   Vec<ExternalRole>,
  by_name: HashMap<String, usize>,
  by_id:   HashMap<RoleId, usize>,
}

impl RoleSet {
  pub fn new(roles: Vec<ExternalRole>) -> Self {
    let mut by_name = HashMap::with_capacity(roles.len());
    let mut by_id = HashMap::with_capacity(roles.len());
    for (idx, role) in roles.iter().enumerate() {
      by_name.entry(role.name.clone()).or_insert(idx);
      by_id.entry(role.id).or_insert(idx);
    }
    Self { roles, by_name, by_id }
  }

  pub fn role_by_name(&self, name: &str) -> Option<&ExternalRole> {
    self.by_name.get(name).map(|&idx| &self.roles[idx])
  }

  pub fn role_by_id(&self, id: RoleId) -> Option<&ExternalRole> {
    self.by_id.get(&id).map(|&idx| &self.roles[idx])
  }

  pub fn contains_id(&self, id: RoleId) -> bool { self.by_id.contains_key(&id) }

  pub fn iter(&self) -> impl Iterator<Item = &ExternalRole> { self.roles.iter() }

  pub fn len(&self) -> usize { self.roles.len() }

  pub fn is_empty(&self) -> bool { self.roles.is_empty() }

  /// Highest position held by any role, `0` when empty.
  pub fn max_position(&self) -> u32 {
    self.roles.iter().map(|r| r.position).max().unwrap_or(0)
  }
}

impl From<Vec<ExternalRole>> for RoleSet {
  fn from(roles: Vec<ExternalRole>) -> Self { Self::new(roles) }
}
