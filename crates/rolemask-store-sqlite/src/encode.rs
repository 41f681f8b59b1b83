//! Encoding and decoding helpers between domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! role ids decimal strings (snowflakes do not fit every integer column
//! comfortably). Colors are stored as plain integers.

use chrono::{DateTime, Utc};
use rolemask_core::{
  color::Color,
  color_rule::{ColorAssignment, ColorRule},
  config::{ConfigValues, Dividers, ObfuscationConfig, ObfuscationMethod},
  event::{OutboxEntry, SubjectEvent},
  role::RoleId,
  subject::{Subject, SubjectKey, SubjectKind},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ids ─────────────────────────────────────────────────────────────────

pub fn encode_role_id(id: RoleId) -> String { id.to_string() }

pub fn decode_role_id(s: &str) -> Result<RoleId> {
  s.parse()
    .map_err(|_| Error::Decode(format!("invalid role id: {s:?}")))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn encode_subject_kind(k: SubjectKind) -> &'static str {
  match k {
    SubjectKind::Group => "group",
    SubjectKind::State => "state",
  }
}

pub fn decode_subject_kind(s: &str) -> Result<SubjectKind> {
  s.parse()
    .map_err(|_| Error::Core(rolemask_core::Error::UnknownSubjectKind(s.to_owned())))
}

pub fn decode_method(s: &str) -> Result<ObfuscationMethod> {
  s.parse()
    .map_err(|_| Error::Core(rolemask_core::Error::UnknownMethod(s.to_owned())))
}

/// `(group_id, state_name)` column pair for a key.
pub fn encode_subject_key(key: &SubjectKey) -> (Option<String>, Option<String>) {
  match key {
    SubjectKey::Group(id) => (Some(encode_uuid(*id)), None),
    SubjectKey::State(name) => (None, Some(name.clone())),
  }
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// A row from `subjects` before parsing.
pub struct RawSubject {
  pub subject_id: String,
  pub kind:       String,
  pub name:       String,
  pub created_at: String,
}

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id: row.get(0)?,
      kind:       row.get(1)?,
      name:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id: decode_uuid(&self.subject_id)?,
      kind:       decode_subject_kind(&self.kind)?,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawConfig::from_row`].
pub const CONFIG_COLUMNS: &str = "config_id, group_id, state_name, opt_out, method, format,
  dividers, min_chars_before_divider, custom_name, use_random_key, random_key,
  rotate_name, reposition, fixed_color, tracked_role_id, last_applied_name,
  created_at, updated_at";

/// A row from `obfuscation_configs` before parsing.
pub struct RawConfig {
  pub config_id:                String,
  pub group_id:                 Option<String>,
  pub state_name:               Option<String>,
  pub opt_out:                  bool,
  pub method:                   String,
  pub format:                   String,
  pub dividers:                 String,
  pub min_chars_before_divider: u32,
  pub custom_name:              String,
  pub use_random_key:           bool,
  pub random_key:               String,
  pub rotate_name:              bool,
  pub reposition:               bool,
  pub fixed_color:              Option<u32>,
  pub tracked_role_id:          Option<String>,
  pub last_applied_name:        String,
  pub created_at:               String,
  pub updated_at:               String,
}

impl RawConfig {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      config_id:                row.get(0)?,
      group_id:                 row.get(1)?,
      state_name:               row.get(2)?,
      opt_out:                  row.get(3)?,
      method:                   row.get(4)?,
      format:                   row.get(5)?,
      dividers:                 row.get(6)?,
      min_chars_before_divider: row.get(7)?,
      custom_name:              row.get(8)?,
      use_random_key:           row.get(9)?,
      random_key:               row.get(10)?,
      rotate_name:              row.get(11)?,
      reposition:               row.get(12)?,
      fixed_color:              row.get(13)?,
      tracked_role_id:          row.get(14)?,
      last_applied_name:        row.get(15)?,
      created_at:               row.get(16)?,
      updated_at:               row.get(17)?,
    })
  }

  pub fn into_config(self) -> Result<ObfuscationConfig> {
    let subject = match (self.group_id, self.state_name) {
      (Some(g), None) => SubjectKey::Group(decode_uuid(&g)?),
      (None, Some(s)) => SubjectKey::State(s),
      _ => {
        return Err(Error::Decode(format!(
          "config {} must reference exactly one of group or state",
          self.config_id
        )));
      }
    };

    Ok(ObfuscationConfig {
      config_id: decode_uuid(&self.config_id)?,
      subject,
      values: ConfigValues {
        opt_out:                  self.opt_out,
        method:                   decode_method(&self.method)?,
        format:                   self.format,
        dividers:                 Dividers::decode(&self.dividers),
        min_chars_before_divider: self.min_chars_before_divider,
        custom_name:              self.custom_name,
        use_random_key:           self.use_random_key,
        random_key:               self.random_key,
        rotate_name_on_rotation:  self.rotate_name,
        reposition_on_rotation:   self.reposition,
        fixed_color:              self.fixed_color.map(Color::from_rgb),
      },
      tracked_role_id: self.tracked_role_id.as_deref().map(decode_role_id).transpose()?,
      last_applied_name: self.last_applied_name,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// A row from `color_rules` before parsing.
pub struct RawRule {
  pub rule_id:        String,
  pub pattern:        String,
  pub case_sensitive: bool,
  pub enabled:        bool,
  pub priority:       u32,
  pub created_at:     String,
}

impl RawRule {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rule_id:        row.get(0)?,
      pattern:        row.get(1)?,
      case_sensitive: row.get(2)?,
      enabled:        row.get(3)?,
      priority:       row.get(4)?,
      created_at:     row.get(5)?,
    })
  }

  pub fn into_rule(self) -> Result<ColorRule> {
    Ok(ColorRule {
      rule_id:        decode_uuid(&self.rule_id)?,
      pattern:        self.pattern,
      case_sensitive: self.case_sensitive,
      enabled:        self.enabled,
      priority:       self.priority,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// A row from `color_assignments` before parsing.
pub struct RawAssignment {
  pub assignment_id: String,
  pub rule_id:       String,
  pub role_id:       String,
  pub role_name:     String,
  pub color:         u32,
  pub created_at:    String,
}

impl RawAssignment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      assignment_id: row.get(0)?,
      rule_id:       row.get(1)?,
      role_id:       row.get(2)?,
      role_name:     row.get(3)?,
      color:         row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_assignment(self) -> Result<ColorAssignment> {
    Ok(ColorAssignment {
      assignment_id: decode_uuid(&self.assignment_id)?,
      rule_id:       decode_uuid(&self.rule_id)?,
      role_id:       decode_role_id(&self.role_id)?,
      role_name:     self.role_name,
      color:         Color::from_rgb(self.color),
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// A row from `outbox` before parsing.
pub struct RawOutbox {
  pub event_id:     String,
  pub payload_json: String,
  pub recorded_at:  String,
}

impl RawOutbox {
  pub fn into_entry(self) -> Result<OutboxEntry> {
    let event: SubjectEvent = serde_json::from_str(&self.payload_json)?;
    Ok(OutboxEntry {
      event_id: decode_uuid(&self.event_id)?,
      event,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
