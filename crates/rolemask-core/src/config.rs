//! Per-subject obfuscation configuration.
//!
//! [`ConfigValues`] holds everything an administrator edits; it is all the
//! naming engine needs, which is what makes live previews possible without a
//! persisted record. [`ObfuscationConfig`] wraps it with identity and the
//! tracking state the sync orchestrator maintains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{
  Error, Result,
  color::Color,
  obfuscate::{PLACEHOLDERS, generate_random_key, is_random_key},
  role::RoleId,
  subject::SubjectKey,
};

/// Longest name the platform accepts for a role, in characters.
pub const ROLE_NAME_MAX_LEN: usize = 100;

/// The only characters, besides alphanumerics, that may appear in a derived
/// name.
pub const ALLOWED_DIVIDERS: [char; 7] = ['┃', '┇', '┆', '︲', '｜', '︱', '➖'];

// ─── Method ──────────────────────────────────────────────────────────────────

/// Keyed hash used to derive a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
  Sha256,
  Blake2s,
}

/// How the digest is rendered as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashEncoding {
  /// Lowercase hexadecimal.
  Hex,
  /// RFC 4648 base32 without padding.
  Base32,
}

/// A (hash algorithm, encoding) pair.
///
/// Deserializing never fails on an unknown name: it falls back to the
/// default method, the same as [`ObfuscationMethod::parse_or`].
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
)]
pub enum ObfuscationMethod {
  #[strum(to_string = "sha256-hex", serialize = "sha256_hex")]
  Sha256Hex,
  #[default]
  #[strum(to_string = "sha256-base32", serialize = "sha256_base32")]
  Sha256Base32,
  #[strum(to_string = "blake2s-hex", serialize = "blake2s_hex")]
  Blake2sHex,
  #[strum(to_string = "blake2s-base32", serialize = "blake2s_base32")]
  Blake2sBase32,
}

impl Serialize for ObfuscationMethod {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ObfuscationMethod {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(Self::parse_or(raw.trim(), Self::default()))
  }
}

impl ObfuscationMethod {
  pub fn algorithm(self) -> HashAlgorithm {
    match self {
      Self::Sha256Hex | Self::Sha256Base32 => HashAlgorithm::Sha256,
      Self::Blake2sHex | Self::Blake2sBase32 => HashAlgorithm::Blake2s,
    }
  }

  pub fn encoding(self) -> HashEncoding {
    match self {
      Self::Sha256Hex | Self::Blake2sHex => HashEncoding::Hex,
      Self::Sha256Base32 | Self::Blake2sBase32 => HashEncoding::Base32,
    }
  }

  /// Parse `value`, falling back to `fallback` for unknown or empty input.
  pub fn parse_or(value: &str, fallback: Self) -> Self {
    value.parse().unwrap_or(fallback)
  }
}

// ─── Dividers ────────────────────────────────────────────────────────────────

/// An ordered, duplicate-free subset of [`ALLOWED_DIVIDERS`].
///
/// Deserialized through [`Dividers::filtered`], so disallowed characters are
/// dropped rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<char>", into = "Vec<char>")]
pub struct Dividers(Vec<char>);

impl Dividers {
  /// Keep only allowed characters, first occurrence wins. Unknown characters
  /// are dropped silently.
  pub fn filtered(chars: impl IntoIterator<Item = char>) -> Self {
    let mut out = Vec::new();
    for c in chars {
      if ALLOWED_DIVIDERS.contains(&c) && !out.contains(&c) {
        out.push(c);
      }
    }
    Self(out)
  }

  /// Decode the comma-separated storage form.
  pub fn decode(raw: &str) -> Self {
    Self::filtered(raw.split(',').filter_map(|part| {
      let mut chars = part.chars();
      match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
      }
    }))
  }

  /// Encode as a comma-separated string.
  pub fn encode(&self) -> String {
    self.0.iter().map(char::to_string).collect::<Vec<_>>().join(",")
  }

  pub fn as_slice(&self) -> &[char] { &self.0 }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn contains(&self, c: char) -> bool { self.0.contains(&c) }
}

impl From<Vec<char>> for Dividers {
  fn from(value: Vec<char>) -> Self { Self::filtered(value) }
}

impl From<Dividers> for Vec<char> {
  fn from(value: Dividers) -> Self { value.0 }
}

// ─── Editable values ─────────────────────────────────────────────────────────

/// The administrator-editable part of a subject's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigValues {
  /// Use the subject's real name verbatim.
  pub opt_out:                  bool,
  pub method:                   ObfuscationMethod,
  /// Template with `{prefix}`, `{hash8}`, `{hash12}`, `{hash16}`; empty uses
  /// the engine default.
  pub format:                   String,
  pub dividers:                 Dividers,
  pub min_chars_before_divider: u32,
  /// When non-empty, replaces hash derivation entirely.
  pub custom_name:              String,
  pub use_random_key:           bool,
  /// Empty unless `use_random_key` is set.
  pub random_key:               String,
  pub rotate_name_on_rotation:  bool,
  pub reposition_on_rotation:   bool,
  /// Pins the role color and exempts the role from rule-based coloring.
  pub fixed_color:              Option<Color>,
}

impl Default for ConfigValues {
  fn default() -> Self {
    Self {
      opt_out:                  false,
      method:                   ObfuscationMethod::default(),
      format:                   String::new(),
      dividers:                 Dividers::default(),
      min_chars_before_divider: 0,
      custom_name:              String::new(),
      use_random_key:           false,
      random_key:               String::new(),
      rotate_name_on_rotation:  true,
      reposition_on_rotation:   true,
      fixed_color:              None,
    }
  }
}

impl ConfigValues {
  /// Normalise and check values coming from an editing surface.
  ///
  /// Strings are trimmed, `opt_out` clears the custom name, disabling the
  /// random key clears it along with both rotation flags, and enabling it
  /// generates a key when none was supplied.
  pub fn validate(mut self) -> Result<Self> {
    self.custom_name = self.custom_name.trim().to_owned();
    self.format = self.format.trim().to_owned();
    self.random_key = self.random_key.trim().to_owned();

    if !self.dividers.is_empty() && self.min_chars_before_divider < 1 {
      return Err(Error::MissingDividerWidth);
    }

    if !self.custom_name.is_empty()
      && !self
        .custom_name
        .chars()
        .all(|c| c.is_alphanumeric() || self.dividers.contains(c))
    {
      return Err(Error::InvalidCustomName);
    }

    validate_format(&self.format, &self.dividers)?;

    if !self.random_key.is_empty() && !is_random_key(&self.random_key) {
      return Err(Error::InvalidRandomKey);
    }

    if self.opt_out {
      self.custom_name.clear();
    }

    if self.use_random_key {
      if self.random_key.is_empty() {
        self.random_key = generate_random_key();
      }
    } else {
      self.random_key.clear();
      self.rotate_name_on_rotation = false;
      self.reposition_on_rotation = false;
    }

    Ok(self)
  }
}

fn validate_format(format: &str, dividers: &Dividers) -> Result<()> {
  if format.is_empty() {
    return Ok(());
  }

  let mut stripped = format.to_owned();
  for placeholder in PLACEHOLDERS {
    stripped = stripped.replace(placeholder, "");
  }
  if let Some(bad) = stripped
    .chars()
    .find(|c| !(c.is_alphanumeric() || dividers.contains(*c)))
  {
    return Err(Error::InvalidFormat(format!(
      "character {bad:?} is not a letter, number, placeholder, or selected divider"
    )));
  }

  let has_hash = ["{hash8}", "{hash12}", "{hash16}"]
    .iter()
    .any(|token| format.contains(token));
  if !has_hash {
    return Err(Error::InvalidFormat(
      "format must include at least one of {hash8}, {hash12}, or {hash16}".into(),
    ));
  }
  Ok(())
}

// ─── Persisted config ────────────────────────────────────────────────────────

/// A subject's stored configuration plus sync tracking state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObfuscationConfig {
  pub config_id:         Uuid,
  pub subject:           SubjectKey,
  pub values:            ConfigValues,
  /// External role last confirmed to carry `last_applied_name`.
  pub tracked_role_id:   Option<RoleId>,
  pub last_applied_name: String,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

/// Filter for listing configurations; `None` fields match anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigFilter {
  pub use_random_key:  Option<bool>,
  pub has_fixed_color: Option<bool>,
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn method_names_round_trip_and_accept_underscores() {
    for method in ObfuscationMethod::iter() {
      assert_eq!(method.to_string().parse::<ObfuscationMethod>().unwrap(), method);
    }
    assert_eq!(
      "blake2s_base32".parse::<ObfuscationMethod>().unwrap(),
      ObfuscationMethod::Blake2sBase32
    );
    assert_eq!(
      ObfuscationMethod::parse_or("md5", ObfuscationMethod::Sha256Hex),
      ObfuscationMethod::Sha256Hex
    );
  }

  #[test]
  fn dividers_filter_and_dedupe() {
    let d = Dividers::filtered(['┃', 'x', '┃', '➖']);
    assert_eq!(d.as_slice(), &['┃', '➖']);
    assert_eq!(Dividers::decode(&d.encode()), d);

    let parsed: Dividers = serde_json::from_str(r#"["-", "┃", "┃"]"#).unwrap();
    assert_eq!(parsed.as_slice(), &['┃']);
  }

  #[test]
  fn unknown_method_deserializes_to_default() {
    let method: ObfuscationMethod = serde_json::from_str(r#""md5""#).unwrap();
    assert_eq!(method, ObfuscationMethod::default());
    let method: ObfuscationMethod = serde_json::from_str(r#""blake2s_hex""#).unwrap();
    assert_eq!(method, ObfuscationMethod::Blake2sHex);
    assert_eq!(serde_json::to_string(&method).unwrap(), r#""blake2s-hex""#);
  }

  #[test]
  fn dividers_require_a_chunk_width() {
    let values = ConfigValues {
      dividers: Dividers::filtered(['┃']),
      ..Default::default()
    };
    assert!(matches!(values.validate(), Err(Error::MissingDividerWidth)));
  }

  #[test]
  fn custom_name_rejects_characters_outside_dividers() {
    let values = ConfigValues {
      custom_name: "Ops Team".into(),
      ..Default::default()
    };
    assert!(matches!(values.validate(), Err(Error::InvalidCustomName)));

    let values = ConfigValues {
      custom_name:              " Ops┃Team ".into(),
      dividers:                 Dividers::filtered(['┃']),
      min_chars_before_divider: 3,
      ..Default::default()
    };
    assert_eq!(values.validate().unwrap().custom_name, "Ops┃Team");
  }

  #[test]
  fn format_must_contain_a_hash_placeholder() {
    let values = ConfigValues { format: "{prefix}abc".into(), ..Default::default() };
    assert!(matches!(values.validate(), Err(Error::InvalidFormat(_))));

    let values = ConfigValues { format: "{hash8}-x".into(), ..Default::default() };
    assert!(matches!(values.validate(), Err(Error::InvalidFormat(_))));

    let values = ConfigValues { format: "r{hash8}".into(), ..Default::default() };
    assert!(values.validate().is_ok());
  }

  #[test]
  fn random_key_is_generated_or_cleared() {
    let values = ConfigValues { use_random_key: true, ..Default::default() };
    let cleaned = values.validate().unwrap();
    assert!(is_random_key(&cleaned.random_key));

    let values = ConfigValues {
      use_random_key: false,
      random_key:     "abcdefgh12345678".into(),
      ..Default::default()
    };
    let cleaned = values.validate().unwrap();
    assert!(cleaned.random_key.is_empty());
    assert!(!cleaned.rotate_name_on_rotation);
    assert!(!cleaned.reposition_on_rotation);

    let values = ConfigValues {
      use_random_key: true,
      random_key:     "short".into(),
      ..Default::default()
    };
    assert!(matches!(values.validate(), Err(Error::InvalidRandomKey)));
  }

  #[test]
  fn opt_out_clears_custom_name() {
    let values = ConfigValues {
      opt_out:     true,
      custom_name: "Alpha".into(),
      ..Default::default()
    };
    assert!(values.validate().unwrap().custom_name.is_empty());
  }
}
