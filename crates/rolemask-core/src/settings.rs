//! Engine-wide and persisted global settings.
//!
//! Defaults for a new subject configuration follow a fixed precedence:
//! per-subject values → the persisted [`GlobalSettings`] record → the
//! compiled-in [`GlobalSettings::default`].

use serde::{Deserialize, Serialize};

use crate::{
  config::{ConfigValues, Dividers, ObfuscationMethod},
  obfuscate::DEFAULT_FORMAT,
};

/// Static settings for the naming engine, loaded from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
  /// When false, real names are used everywhere.
  pub enabled:               bool,
  /// HMAC key shared by every derivation.
  pub secret:                String,
  /// Prepended to every derived name.
  pub prefix:                String,
  /// Template used when a subject has none.
  pub format:                String,
  pub default_method:        ObfuscationMethod,
  /// Only use a name when a role with that name already exists.
  pub require_existing_role: bool,
  /// Include the member's state alongside their groups.
  pub include_states:        bool,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      enabled:               true,
      secret:                String::new(),
      prefix:                String::new(),
      format:                DEFAULT_FORMAT.to_owned(),
      default_method:        ObfuscationMethod::default(),
      require_existing_role: true,
      include_states:        true,
    }
  }
}

/// The singleton settings record administrators edit at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
  /// Run a subject sync after its configuration is saved.
  pub sync_on_save:                     bool,
  pub periodic_sync_enabled:            bool,
  pub color_rule_sync_enabled:          bool,
  pub random_key_rotation_enabled:      bool,
  pub default_opt_out:                  bool,
  pub default_use_random_key:           bool,
  pub default_rotate_name:              bool,
  pub default_reposition:               bool,
  pub default_method:                   ObfuscationMethod,
  pub default_dividers:                 Dividers,
  pub default_min_chars_before_divider: u32,
}

impl Default for GlobalSettings {
  fn default() -> Self {
    Self {
      sync_on_save:                     true,
      periodic_sync_enabled:            false,
      color_rule_sync_enabled:          false,
      random_key_rotation_enabled:      false,
      default_opt_out:                  false,
      default_use_random_key:           false,
      default_rotate_name:              true,
      default_reposition:               true,
      default_method:                   ObfuscationMethod::default(),
      default_dividers:                 Dividers::default(),
      default_min_chars_before_divider: 0,
    }
  }
}

impl GlobalSettings {
  /// Values for a configuration created on first encounter of a subject.
  ///
  /// A random key is not generated here; the orchestrator fills it on first
  /// use so the key is persisted before any name is derived from it.
  pub fn new_config_values(&self) -> ConfigValues {
    ConfigValues {
      opt_out: self.default_opt_out,
      method: self.default_method,
      dividers: self.default_dividers.clone(),
      min_chars_before_divider: if self.default_dividers.is_empty() {
        self.default_min_chars_before_divider
      } else {
        self.default_min_chars_before_divider.max(1)
      },
      use_random_key: self.default_use_random_key,
      rotate_name_on_rotation: self.default_use_random_key && self.default_rotate_name,
      reposition_on_rotation: self.default_use_random_key && self.default_reposition,
      ..ConfigValues::default()
    }
  }
}
