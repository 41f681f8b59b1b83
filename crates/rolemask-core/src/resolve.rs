//! Role reconciliation: which name a subject should actually carry, given a
//! roleset snapshot and its tracking history.

use serde::Serialize;

use crate::{
  config::ObfuscationConfig,
  obfuscate::resolve_desired_name,
  role::{ExternalRole, RoleId, RoleSet},
  settings::EngineSettings,
  subject::Subject,
};

/// Outcome of resolving a subject against a roleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleNameResolution {
  pub desired_name:    String,
  /// The name to present, or `None` when the subject has no usable role.
  pub used_name:       Option<String>,
  pub matched_role_id: Option<RoleId>,
  pub used_original:   bool,
}

/// Decide the name to use for `subject_name`.
///
/// 1. A role already named the desired name is used as is.
/// 2. Otherwise, with `require_existing_role`, a role carrying the real name
///    is used and the real name kept.
/// 3. Without `require_existing_role` the desired name is used even though
///    no role has it yet; the caller must rename one into existence.
/// 4. Otherwise there is no usable name.
pub fn resolve_role_name(
  subject_name: &str,
  config:       Option<&ObfuscationConfig>,
  roleset:      &RoleSet,
  engine:       &EngineSettings,
) -> RoleNameResolution {
  let desired = resolve_desired_name(subject_name, config.map(|c| &c.values), engine);

  if let Some(role) = roleset.role_by_name(&desired) {
    return RoleNameResolution {
      used_name:       Some(desired.clone()),
      matched_role_id: Some(role.id),
      used_original:   desired == subject_name,
      desired_name:    desired,
    };
  }

  if engine.require_existing_role {
    if let Some(original) = roleset.role_by_name(subject_name) {
      return RoleNameResolution {
        desired_name:    desired,
        used_name:       Some(subject_name.to_owned()),
        matched_role_id: Some(original.id),
        used_original:   true,
      };
    }
    return RoleNameResolution {
      desired_name:    desired,
      used_name:       None,
      matched_role_id: None,
      used_original:   false,
    };
  }

  RoleNameResolution {
    used_name:       Some(desired.clone()),
    matched_role_id: None,
    used_original:   desired == subject_name,
    desired_name:    desired,
  }
}

/// Whether a subject is represented in the roleset at all: by its desired
/// name, its real name, or its tracked role id.
pub fn has_role(
  subject: &Subject,
  config:  Option<&ObfuscationConfig>,
  roleset: &RoleSet,
  engine:  &EngineSettings,
) -> bool {
  let desired = resolve_desired_name(&subject.name, config.map(|c| &c.values), engine);
  roleset.role_by_name(&desired).is_some()
    || roleset.role_by_name(&subject.name).is_some()
    || config
      .and_then(|c| c.tracked_role_id)
      .is_some_and(|id| roleset.contains_id(id))
}

// ─── Rename candidates ───────────────────────────────────────────────────────

/// A single way of locating the role to rename for a subject.
pub struct CandidateLookup {
  pub label:  &'static str,
  pub lookup: for<'a> fn(&'a RoleSet, &Subject, &ObfuscationConfig) -> Option<&'a ExternalRole>,
}

fn by_tracked_id<'a>(
  roleset: &'a RoleSet,
  _:       &Subject,
  config:  &ObfuscationConfig,
) -> Option<&'a ExternalRole> {
  config.tracked_role_id.and_then(|id| roleset.role_by_id(id))
}

fn by_last_applied_name<'a>(
  roleset: &'a RoleSet,
  _:       &Subject,
  config:  &ObfuscationConfig,
) -> Option<&'a ExternalRole> {
  if config.last_applied_name.is_empty() {
    return None;
  }
  roleset.role_by_name(&config.last_applied_name)
}

fn by_real_name<'a>(
  roleset: &'a RoleSet,
  subject: &Subject,
  _:       &ObfuscationConfig,
) -> Option<&'a ExternalRole> {
  roleset.role_by_name(&subject.name)
}

/// Lookups tried in order when no role carries the desired name yet.
pub const RENAME_CANDIDATES: [CandidateLookup; 3] = [
  CandidateLookup { label: "tracked role id", lookup: by_tracked_id },
  CandidateLookup { label: "last applied name", lookup: by_last_applied_name },
  CandidateLookup { label: "real name", lookup: by_real_name },
];

/// First role any of [`RENAME_CANDIDATES`] finds, with the label of the
/// lookup that found it.
pub fn rename_candidate<'a>(
  roleset: &'a RoleSet,
  subject: &Subject,
  config:  &ObfuscationConfig,
) -> Option<(&'static str, &'a ExternalRole)> {
  RENAME_CANDIDATES
    .iter()
    .find_map(|c| (c.lookup)(roleset, subject, config).map(|role| (c.label, role)))
}
