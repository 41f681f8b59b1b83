//! [`SqliteStore`], the SQLite implementation of [`ObfuscationStore`].

use std::path::Path;

use chrono::Utc;
use rolemask_core::{
  color_rule::{ColorAssignment, ColorRule, NewColorAssignment, NewColorRule},
  config::{ConfigFilter, ConfigValues, ObfuscationConfig},
  event::{OutboxEntry, SubjectEvent},
  role::RoleId,
  settings::GlobalSettings,
  store::ObfuscationStore,
  subject::{NewSubject, Subject, SubjectKey, SubjectKind},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    CONFIG_COLUMNS, RawAssignment, RawConfig, RawOutbox, RawRule, RawSubject, encode_dt,
    encode_role_id, encode_subject_key, encode_subject_kind, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rolemask store backed by a single SQLite file.
///
/// Cloning shares the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Owned column values for the editable part of a configuration.
struct ValueColumns {
  opt_out:     bool,
  method:      String,
  format:      String,
  dividers:    String,
  min_chars:   u32,
  custom_name: String,
  use_key:     bool,
  random_key:  String,
  rotate_name: bool,
  reposition:  bool,
  fixed_color: Option<u32>,
}

impl From<&ConfigValues> for ValueColumns {
  fn from(v: &ConfigValues) -> Self {
    Self {
      opt_out:     v.opt_out,
      method:      v.method.to_string(),
      format:      v.format.clone(),
      dividers:    v.dividers.encode(),
      min_chars:   v.min_chars_before_divider,
      custom_name: v.custom_name.clone(),
      use_key:     v.use_random_key,
      random_key:  v.random_key.clone(),
      rotate_name: v.rotate_name_on_rotation,
      reposition:  v.reposition_on_rotation,
      fixed_color: v.fixed_color.map(|c| c.value()),
    }
  }
}

fn select_config_by_key(
  conn: &rusqlite::Connection,
  group_id: Option<&str>,
  state_name: Option<&str>,
) -> rusqlite::Result<Option<RawConfig>> {
  let sql = format!(
    "SELECT {CONFIG_COLUMNS} FROM obfuscation_configs
     WHERE group_id IS ?1 AND state_name IS ?2"
  );
  conn
    .query_row(&sql, rusqlite::params![group_id, state_name], RawConfig::from_row)
    .optional()
}

fn select_config_by_id(
  conn: &rusqlite::Connection,
  config_id: &str,
) -> rusqlite::Result<Option<RawConfig>> {
  let sql = format!("SELECT {CONFIG_COLUMNS} FROM obfuscation_configs WHERE config_id = ?1");
  conn
    .query_row(&sql, rusqlite::params![config_id], RawConfig::from_row)
    .optional()
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load a configuration by id or fail with [`Error::ConfigNotFound`].
  async fn config_by_id(&self, config_id: Uuid) -> Result<ObfuscationConfig> {
    let id_str = encode_uuid(config_id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_config_by_id(conn, &id_str)?))
      .await?;
    raw
      .ok_or(Error::ConfigNotFound(config_id))?
      .into_config()
  }

  /// Run an `UPDATE` against one configuration, failing when no row matched.
  async fn update_config<F>(&self, config_id: Uuid, update: F) -> Result<()>
  where
    F: FnOnce(&rusqlite::Connection, &str, &str) -> rusqlite::Result<usize> + Send + 'static,
  {
    let id_str = encode_uuid(config_id);
    let now_str = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| Ok(update(conn, &id_str, &now_str)?))
      .await?;
    if changed == 0 {
      return Err(Error::ConfigNotFound(config_id));
    }
    Ok(())
  }
}

// ─── ObfuscationStore impl ───────────────────────────────────────────────────

impl ObfuscationStore for SqliteStore {
  type Error = Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn add_subject(&self, input: NewSubject) -> Result<Subject> {
    let subject = Subject {
      subject_id: Uuid::new_v4(),
      kind:       input.kind,
      name:       input.name,
      created_at: Utc::now(),
    };
    let event = SubjectEvent::Created { subject_id: subject.subject_id };

    let id_str       = encode_uuid(subject.subject_id);
    let kind_str     = encode_subject_kind(subject.kind).to_owned();
    let name         = subject.name.clone();
    let at_str       = encode_dt(subject.created_at);
    let event_id_str = encode_uuid(Uuid::new_v4());
    let event_type   = event.discriminant().to_owned();
    let payload      = serde_json::to_string(&event)?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO subjects (subject_id, kind, name, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, kind_str, name, at_str],
        )?;
        tx.execute(
          "INSERT INTO outbox (event_id, event_type, payload_json, recorded_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![event_id_str, event_type, payload, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(subject)
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, kind, name, created_at FROM subjects WHERE subject_id = ?1",
              rusqlite::params![id_str],
              RawSubject::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn list_subjects(&self, kind: Option<SubjectKind>) -> Result<Vec<Subject>> {
    let kind_str = kind.map(encode_subject_kind).map(str::to_owned);

    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT subject_id, kind, name, created_at FROM subjects
           WHERE ?1 IS NULL OR kind = ?1
           ORDER BY name, subject_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str], RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn delete_subject(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let found: Option<(String, String)> = tx
          .query_row(
            "SELECT kind, name FROM subjects WHERE subject_id = ?1",
            rusqlite::params![id_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let Some((kind, name)) = found else {
          return Ok(false);
        };

        let (group_id, state_name) = if kind == encode_subject_kind(SubjectKind::State) {
          (None, Some(name))
        } else {
          (Some(id_str.clone()), None)
        };

        let tracked: Option<Option<String>> = tx
          .query_row(
            "SELECT tracked_role_id FROM obfuscation_configs
             WHERE group_id IS ?1 AND state_name IS ?2",
            rusqlite::params![group_id, state_name],
            |r| r.get(0),
          )
          .optional()?;
        if let Some(Some(role_id)) = tracked {
          tx.execute(
            "DELETE FROM color_assignments WHERE role_id = ?1",
            rusqlite::params![role_id],
          )?;
        }
        tx.execute(
          "DELETE FROM obfuscation_configs WHERE group_id IS ?1 AND state_name IS ?2",
          rusqlite::params![group_id, state_name],
        )?;
        tx.execute("DELETE FROM subjects WHERE subject_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(deleted)
  }

  // ── Configurations ────────────────────────────────────────────────────────

  async fn get_config(&self, key: &SubjectKey) -> Result<Option<ObfuscationConfig>> {
    let (group_id, state_name) = encode_subject_key(key);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(select_config_by_key(conn, group_id.as_deref(), state_name.as_deref())?)
      })
      .await?;

    raw.map(RawConfig::into_config).transpose()
  }

  async fn get_or_create_config(
    &self,
    key:      &SubjectKey,
    defaults: ConfigValues,
  ) -> Result<(ObfuscationConfig, bool)> {
    let (group_id, state_name) = encode_subject_key(key);
    let cols   = ValueColumns::from(&defaults);
    let id_str = encode_uuid(Uuid::new_v4());
    let now    = encode_dt(Utc::now());

    let (raw, created) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(existing) =
          select_config_by_key(&tx, group_id.as_deref(), state_name.as_deref())?
        {
          return Ok((Some(existing), false));
        }
        tx.execute(
          "INSERT INTO obfuscation_configs (
             config_id, group_id, state_name, opt_out, method, format, dividers,
             min_chars_before_divider, custom_name, use_random_key, random_key,
             rotate_name, reposition, fixed_color, tracked_role_id, last_applied_name,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                     NULL, '', ?15, ?15)",
          rusqlite::params![
            id_str,
            group_id,
            state_name,
            cols.opt_out,
            cols.method,
            cols.format,
            cols.dividers,
            cols.min_chars,
            cols.custom_name,
            cols.use_key,
            cols.random_key,
            cols.rotate_name,
            cols.reposition,
            cols.fixed_color,
            now,
          ],
        )?;
        let created = select_config_by_id(&tx, &id_str)?;
        tx.commit()?;
        Ok((created, true))
      })
      .await?;

    let raw = raw.ok_or_else(|| Error::Decode("configuration vanished after insert".into()))?;
    Ok((raw.into_config()?, created))
  }

  async fn update_config_values(
    &self,
    config_id: Uuid,
    values:    ConfigValues,
  ) -> Result<ObfuscationConfig> {
    let cols = ValueColumns::from(&values);
    self
      .update_config(config_id, move |conn, id, now| {
        conn.execute(
          "UPDATE obfuscation_configs SET
             opt_out = ?2, method = ?3, format = ?4, dividers = ?5,
             min_chars_before_divider = ?6, custom_name = ?7, use_random_key = ?8,
             random_key = ?9, rotate_name = ?10, reposition = ?11, fixed_color = ?12,
             updated_at = ?13
           WHERE config_id = ?1",
          rusqlite::params![
            id,
            cols.opt_out,
            cols.method,
            cols.format,
            cols.dividers,
            cols.min_chars,
            cols.custom_name,
            cols.use_key,
            cols.random_key,
            cols.rotate_name,
            cols.reposition,
            cols.fixed_color,
            now,
          ],
        )
      })
      .await?;
    self.config_by_id(config_id).await
  }

  async fn set_random_key(&self, config_id: Uuid, key: String) -> Result<()> {
    self
      .update_config(config_id, move |conn, id, now| {
        conn.execute(
          "UPDATE obfuscation_configs SET random_key = ?2, updated_at = ?3 WHERE config_id = ?1",
          rusqlite::params![id, key, now],
        )
      })
      .await
  }

  async fn record_applied(&self, config_id: Uuid, role_id: RoleId, name: String) -> Result<()> {
    let role_str = encode_role_id(role_id);
    self
      .update_config(config_id, move |conn, id, now| {
        conn.execute(
          "UPDATE obfuscation_configs
           SET tracked_role_id = ?2, last_applied_name = ?3, updated_at = ?4
           WHERE config_id = ?1",
          rusqlite::params![id, role_str, name, now],
        )
      })
      .await
  }

  async fn list_configs(&self, filter: ConfigFilter) -> Result<Vec<ObfuscationConfig>> {
    let raws: Vec<RawConfig> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause from the filter flags.
        let mut conds: Vec<&'static str> = vec![];
        match filter.use_random_key {
          Some(true) => conds.push("use_random_key = 1"),
          Some(false) => conds.push("use_random_key = 0"),
          None => {}
        }
        match filter.has_fixed_color {
          Some(true) => conds.push("fixed_color IS NOT NULL"),
          Some(false) => conds.push("fixed_color IS NULL"),
          None => {}
        }
        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {CONFIG_COLUMNS} FROM obfuscation_configs {where_clause} ORDER BY created_at"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawConfig::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConfig::into_config).collect()
  }

  // ── Global settings ───────────────────────────────────────────────────────

  async fn global_settings(&self) -> Result<GlobalSettings> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row("SELECT settings_json FROM global_settings WHERE id = 1", [], |r| {
              r.get(0)
            })
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(json) => Ok(serde_json::from_str(&json)?),
      None => Ok(GlobalSettings::default()),
    }
  }

  async fn save_global_settings(&self, settings: GlobalSettings) -> Result<()> {
    let json = serde_json::to_string(&settings)?;
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO global_settings (id, settings_json) VALUES (1, ?1)
           ON CONFLICT(id) DO UPDATE SET settings_json = excluded.settings_json",
          rusqlite::params![json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Color rules ───────────────────────────────────────────────────────────

  async fn list_color_rules(&self, enabled_only: bool) -> Result<Vec<ColorRule>> {
    let raws: Vec<RawRule> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT rule_id, pattern, case_sensitive, enabled, priority, created_at
           FROM color_rules
           WHERE enabled = 1 OR ?1 = 0
           ORDER BY priority ASC, rowid ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![enabled_only], RawRule::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRule::into_rule).collect()
  }

  async fn add_color_rule(&self, input: NewColorRule) -> Result<ColorRule> {
    // Reject patterns that cannot compile before they reach the table.
    rolemask_core::color_rule::compile_pattern(&input.pattern, input.case_sensitive)?;

    let rule = ColorRule {
      rule_id:        Uuid::new_v4(),
      pattern:        input.pattern,
      case_sensitive: input.case_sensitive,
      enabled:        input.enabled,
      priority:       input.priority,
      created_at:     Utc::now(),
    };

    let id_str  = encode_uuid(rule.rule_id);
    let pattern = rule.pattern.clone();
    let at_str  = encode_dt(rule.created_at);
    let (case_sensitive, enabled, priority) = (rule.case_sensitive, rule.enabled, rule.priority);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO color_rules (rule_id, pattern, case_sensitive, enabled, priority, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, pattern, case_sensitive, enabled, priority, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(rule)
  }

  async fn delete_color_rule(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM color_rules WHERE rule_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Color assignments ─────────────────────────────────────────────────────

  async fn list_color_assignments(&self) -> Result<Vec<ColorAssignment>> {
    let raws: Vec<RawAssignment> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT assignment_id, rule_id, role_id, role_name, color, created_at
           FROM color_assignments ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map([], RawAssignment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAssignment::into_assignment).collect()
  }

  async fn add_color_assignment(&self, input: NewColorAssignment) -> Result<ColorAssignment> {
    let assignment = ColorAssignment {
      assignment_id: Uuid::new_v4(),
      rule_id:       input.rule_id,
      role_id:       input.role_id,
      role_name:     input.role_name,
      color:         input.color,
      created_at:    Utc::now(),
    };

    let id_str    = encode_uuid(assignment.assignment_id);
    let rule_str  = encode_uuid(assignment.rule_id);
    let role_str  = encode_role_id(assignment.role_id);
    let role_name = assignment.role_name.clone();
    let color     = assignment.color.value();
    let at_str    = encode_dt(assignment.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO color_assignments (assignment_id, rule_id, role_id, role_name, color, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, rule_str, role_str, role_name, color, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(assignment)
  }

  async fn delete_color_assignments(&self, ids: Vec<Uuid>) -> Result<usize> {
    let id_strs: Vec<String> = ids.into_iter().map(encode_uuid).collect();
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        for id in &id_strs {
          removed += tx.execute(
            "DELETE FROM color_assignments WHERE assignment_id = ?1",
            rusqlite::params![id],
          )?;
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;
    Ok(removed)
  }

  async fn rename_color_assignment(&self, id: Uuid, role_name: String) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE color_assignments SET role_name = ?2 WHERE assignment_id = ?1",
          rusqlite::params![id_str, role_name],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Outbox ────────────────────────────────────────────────────────────────

  async fn pending_events(&self, limit: usize) -> Result<Vec<OutboxEntry>> {
    let limit_val = limit as i64;
    let raws: Vec<RawOutbox> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, payload_json, recorded_at FROM outbox
           WHERE completed_at IS NULL
           ORDER BY rowid
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], |row| {
            Ok(RawOutbox {
              event_id:     row.get(0)?,
              payload_json: row.get(1)?,
              recorded_at:  row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOutbox::into_entry).collect()
  }

  async fn complete_event(&self, event_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(event_id);
    let now    = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE outbox SET completed_at = ?2 WHERE event_id = ?1",
          rusqlite::params![id_str, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
