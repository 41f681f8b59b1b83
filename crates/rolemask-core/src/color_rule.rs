//! Color rules and the assignments they produce.
//!
//! A rule is a `*`-wildcard pattern over role names. Rules run in
//! `(priority, created_at)` order; the first rule to match an uncolored,
//! unassigned role claims it.

use chrono::{DateTime, Utc};
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, color::Color, role::RoleId};

/// A priority-ordered name pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRule {
  pub rule_id:        Uuid,
  /// Glob where `*` matches any run of characters; everything else is
  /// literal.
  pub pattern:        String,
  pub case_sensitive: bool,
  pub enabled:        bool,
  /// Lower runs first.
  pub priority:       u32,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewColorRule {
  pub pattern:        String,
  #[serde(default)]
  pub case_sensitive: bool,
  #[serde(default = "default_enabled")]
  pub enabled:        bool,
  #[serde(default)]
  pub priority:       u32,
}

fn default_enabled() -> bool { true }

impl ColorRule {
  /// Compile the pattern.
  pub fn matcher(&self) -> Result<GlobMatcher> {
    compile_pattern(&self.pattern, self.case_sensitive)
  }
}

/// Compile a `*`-only wildcard pattern; every other glob metacharacter is
/// escaped and runs of `*` collapse to one.
pub fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<GlobMatcher> {
  if pattern.trim().is_empty() {
    return Err(Error::InvalidPattern { pattern: pattern.to_owned(), reason: "empty".into() });
  }

  let mut escaped = String::with_capacity(pattern.len());
  let mut prev_star = false;
  for c in pattern.chars() {
    if c == '*' && prev_star {
      continue;
    }
    prev_star = c == '*';
    if matches!(c, '?' | '[' | ']' | '{' | '}' | '\\' | '!') {
      escaped.push('\\');
    }
    escaped.push(c);
  }

  GlobBuilder::new(&escaped)
    .case_insensitive(!case_sensitive)
    .literal_separator(false)
    .backslash_escape(true)
    .build()
    .map(|glob| glob.compile_matcher())
    .map_err(|e| Error::InvalidPattern { pattern: pattern.to_owned(), reason: e.to_string() })
}

/// A color claimed for one role by one rule.
///
/// At most one assignment exists per role and per color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAssignment {
  pub assignment_id: Uuid,
  pub rule_id:       Uuid,
  pub role_id:       RoleId,
  /// Denormalised; refreshed when the role is renamed.
  pub role_name:     String,
  pub color:         Color,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewColorAssignment {
  pub rule_id:   Uuid,
  pub role_id:   RoleId,
  pub role_name: String,
  pub color:     Color,
}
