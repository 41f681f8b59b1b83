//! [`Syncer`]: drives subject configurations onto the platform's roles.

use rolemask_core::{
  color::{Color, PaletteSettings, build_palette},
  config::{ConfigValues, ObfuscationConfig},
  obfuscate::{generate_random_key, preview_name, resolve_desired_name},
  platform::{PlatformError, RoleClient, RolePatch, RolePosition},
  resolve::rename_candidate,
  role::{RoleId, RoleSet},
  settings::{EngineSettings, GlobalSettings},
  store::ObfuscationStore,
  subject::{Subject, SubjectKind},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  control::BatchControl,
  retry::{RetryPolicy, Sleeper, TokioSleeper, call_with_retry},
  rotation::RepositionSettings,
};

/// Static orchestrator settings, loaded from the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
  pub obfuscation: EngineSettings,
  pub retry:       RetryPolicy,
  pub rotation:    RepositionSettings,
  pub palette:     PaletteSettings,
}

/// Outcome of saving a subject's configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSaved {
  pub config: ObfuscationConfig,
  /// `None` when sync-on-save is off.
  pub synced: Option<bool>,
}

/// The sync orchestrator.
///
/// Every batch entry point returns a count of successful items. A failure
/// on one subject or role is logged and counted as a miss; only failures
/// that prevent the batch from starting (store unreachable, roleset fetch
/// exhausted) are returned as errors.
pub struct Syncer<S, C, Z = TokioSleeper> {
  pub(crate) store:    S,
  pub(crate) client:   C,
  pub(crate) sleeper:  Z,
  pub(crate) settings: SyncSettings,
  pub(crate) palette:  Vec<Color>,
}

impl<S, C> Syncer<S, C>
where
  S: ObfuscationStore,
  C: RoleClient,
{
  pub fn new(store: S, client: C, settings: SyncSettings) -> Self {
    Self::with_sleeper(store, client, settings, TokioSleeper)
  }
}

impl<S, C, Z> Syncer<S, C, Z>
where
  S: ObfuscationStore,
  C: RoleClient,
  Z: Sleeper,
{
  pub fn with_sleeper(store: S, client: C, settings: SyncSettings, sleeper: Z) -> Self {
    let palette = build_palette(&settings.palette);
    Self { store, client, sleeper, settings, palette }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn client(&self) -> &C { &self.client }

  pub fn engine(&self) -> &EngineSettings { &self.settings.obfuscation }

  // ── Platform calls ────────────────────────────────────────────────────────

  pub(crate) async fn fetch_roleset(&self, use_cache: bool) -> Result<RoleSet> {
    let roles = call_with_retry(&self.settings.retry, &self.sleeper, "list roles", || {
      self.client.list_roles(use_cache)
    })
    .await?;
    Ok(RoleSet::new(roles))
  }

  /// Patch a role and drop the cached roleset on success.
  pub(crate) async fn patch(&self, role_id: RoleId, patch: RolePatch) -> Result<(), PlatformError> {
    call_with_retry(&self.settings.retry, &self.sleeper, "patch role", || {
      self.client.patch_role(role_id, patch.clone())
    })
    .await?;
    self.client.invalidate_role_cache();
    Ok(())
  }

  pub(crate) async fn reposition(&self, positions: Vec<RolePosition>) -> Result<(), PlatformError> {
    call_with_retry(&self.settings.retry, &self.sleeper, "reposition roles", || {
      self.client.reposition_roles(positions.clone())
    })
    .await?;
    self.client.invalidate_role_cache();
    Ok(())
  }

  // ── Store helpers ─────────────────────────────────────────────────────────

  pub(crate) async fn global_settings(&self) -> Result<GlobalSettings> {
    self.store.global_settings().await.map_err(Error::store)
  }

  pub(crate) async fn subject(&self, subject_id: Uuid) -> Result<Option<Subject>> {
    self.store.get_subject(subject_id).await.map_err(Error::store)
  }

  /// Subjects a batch visits: every group, plus states when enabled.
  pub(crate) async fn batch_subjects(&self) -> Result<Vec<Subject>> {
    let subjects = self.store.list_subjects(None).await.map_err(Error::store)?;
    Ok(
      subjects
        .into_iter()
        .filter(|s| s.kind == SubjectKind::Group || self.settings.obfuscation.include_states)
        .collect(),
    )
  }

  /// Load or create the subject's configuration, persisting a random key
  /// before anything is derived from it.
  pub(crate) async fn ensure_config(
    &self,
    subject: &Subject,
    defaults: ConfigValues,
  ) -> Result<ObfuscationConfig> {
    let key = subject.key();
    let (mut config, created) = self
      .store
      .get_or_create_config(&key, defaults)
      .await
      .map_err(Error::store)?;
    if created {
      debug!(subject = %subject.name, "created default configuration");
    }

    if config.values.use_random_key && config.values.random_key.is_empty() {
      let random_key = generate_random_key();
      self
        .store
        .set_random_key(config.config_id, random_key.clone())
        .await
        .map_err(Error::store)?;
      config.values.random_key = random_key;
    }
    Ok(config)
  }

  async fn record(&self, config: &ObfuscationConfig, role_id: RoleId, name: &str) -> Result<()> {
    self
      .store
      .record_applied(config.config_id, role_id, name.to_owned())
      .await
      .map_err(Error::store)
  }

  // ── Subject sync ──────────────────────────────────────────────────────────

  /// Sync one subject against a freshly fetched roleset.
  pub async fn sync_subject(&self, subject_id: Uuid) -> Result<bool> {
    let Some(subject) = self.subject(subject_id).await? else {
      warn!(%subject_id, "subject no longer exists");
      return Ok(false);
    };
    let global = self.global_settings().await?;
    let roleset = self.fetch_roleset(false).await?;
    self.sync_one(&subject, &roleset, &global).await
  }

  /// Sync every batch subject against one shared roleset snapshot.
  pub async fn sync_all(&self, control: &BatchControl) -> Result<usize> {
    let global = self.global_settings().await?;
    let subjects = self.batch_subjects().await?;
    let roleset = self.fetch_roleset(false).await?;

    let mut synced = 0;
    for subject in &subjects {
      if control.should_stop() {
        warn!(synced, "subject sync stopped before finishing");
        break;
      }
      match self.sync_one(subject, &roleset, &global).await {
        Ok(true) => synced += 1,
        Ok(false) => {}
        Err(err) => warn!(subject = %subject.name, error = %err, "subject sync failed"),
      }
    }

    info!(synced, total = subjects.len(), "subject sync finished");
    Ok(synced)
  }

  pub(crate) async fn sync_one(
    &self,
    subject: &Subject,
    roleset: &RoleSet,
    global:  &GlobalSettings,
  ) -> Result<bool> {
    let config = self.ensure_config(subject, global.new_config_values()).await?;
    let desired = resolve_desired_name(&subject.name, Some(&config.values), self.engine());
    let pinned = config.values.fixed_color;
    debug!(subject = %subject.name, %desired, "resolved desired role name");

    if let Some(role) = roleset.role_by_name(&desired) {
      self.record(&config, role.id, &desired).await?;
      if let Some(color) = pinned.filter(|c| c.value() != role.color) {
        match self.patch(role.id, RolePatch::recolor(color)).await {
          Ok(()) => info!(role_id = role.id, %color, "applied pinned color"),
          Err(err) => warn!(role_id = role.id, error = %err, "could not apply pinned color"),
        }
      }
      return Ok(true);
    }

    let Some((strategy, candidate)) = rename_candidate(roleset, subject, &config) else {
      info!(subject = %subject.name, "no role found to rename");
      return Ok(false);
    };

    if candidate.name == desired {
      self.record(&config, candidate.id, &desired).await?;
      return Ok(true);
    }

    let patch = RolePatch {
      name:  Some(desired.clone()),
      color: pinned.filter(|c| c.value() != candidate.color),
    };
    match self.patch(candidate.id, patch).await {
      Ok(()) => {
        info!(
          role_id = candidate.id,
          from = %candidate.name,
          to = %desired,
          found_by = strategy,
          "renamed role"
        );
        self.record(&config, candidate.id, &desired).await?;
        Ok(true)
      }
      Err(err) => {
        warn!(role_id = candidate.id, subject = %subject.name, error = %err, "rename failed");
        Ok(false)
      }
    }
  }

  // ── Editing ───────────────────────────────────────────────────────────────

  /// Validate and save a subject's configuration, then sync it when the
  /// global sync-on-save switch is on.
  ///
  /// A draft that keeps `use_random_key` on but leaves the key blank keeps
  /// the stored key. Only rotation replaces a key that is already set.
  pub async fn update_config(
    &self,
    subject_id: Uuid,
    mut values: ConfigValues,
  ) -> Result<ConfigSaved> {
    let subject = self
      .subject(subject_id)
      .await?
      .ok_or(rolemask_core::Error::SubjectNotFound(subject_id))?;

    let key = subject.key();
    if values.use_random_key
      && values.random_key.trim().is_empty()
      && let Some(stored) = self.store.get_config(&key).await.map_err(Error::store)?
    {
      values.random_key = stored.values.random_key;
    }
    let values = values.validate()?;
    let global = self.global_settings().await?;

    let existing = self.ensure_config(&subject, global.new_config_values()).await?;
    let config = self
      .store
      .update_config_values(existing.config_id, values)
      .await
      .map_err(Error::store)?;

    let synced = if global.sync_on_save {
      let outcome = match self.fetch_roleset(false).await {
        Ok(roleset) => self.sync_one(&subject, &roleset, &global).await,
        Err(err) => Err(err),
      };
      Some(outcome.unwrap_or_else(|err| {
        warn!(subject = %subject.name, error = %err, "sync on save failed");
        false
      }))
    } else {
      None
    };

    Ok(ConfigSaved { config, synced })
  }

  /// The name `draft` would produce for `subject_name`. No I/O.
  pub fn preview(&self, subject_name: &str, draft: &ConfigValues) -> String {
    preview_name(subject_name, draft, self.engine())
  }
}
