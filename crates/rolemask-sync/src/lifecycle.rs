//! Subject lifecycle: outbox consumption, role discovery, the managed-subject
//! view, and the member role-name hook.

use rolemask_core::{
  config::{ConfigValues, ObfuscationConfig},
  event::SubjectEvent,
  obfuscate::resolve_desired_name,
  platform::RoleClient,
  resolve::{has_role, resolve_role_name},
  store::ObfuscationStore,
  subject::{Subject, SubjectKey, SubjectKind},
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Error, Result, Syncer, control::BatchControl, retry::Sleeper};

/// A subject with a role on the platform, as shown to administrators.
#[derive(Debug, Clone, Serialize)]
pub struct ManagedSubject {
  pub subject:      Subject,
  pub config:       ObfuscationConfig,
  pub desired_name: String,
  /// Name of the role currently standing in for the subject, if any.
  pub current_role: Option<String>,
  pub role_exists:  bool,
}

impl<S, C, Z> Syncer<S, C, Z>
where
  S: ObfuscationStore,
  C: RoleClient,
  Z: Sleeper,
{
  // ── Outbox ────────────────────────────────────────────────────────────────

  /// Consume up to `limit` pending subject events.
  ///
  /// An event whose handling fails stays pending for the next run. Returns
  /// the number of events completed.
  pub async fn process_outbox(&self, limit: usize) -> Result<usize> {
    let pending = self.store.pending_events(limit).await.map_err(Error::store)?;
    let mut completed = 0;
    let mut run_colors = false;

    for entry in pending {
      match self.handle_event(&entry.event).await {
        Ok(wants_colors) => {
          run_colors |= wants_colors;
          self.store.complete_event(entry.event_id).await.map_err(Error::store)?;
          completed += 1;
        }
        Err(err) => {
          warn!(event_id = %entry.event_id, error = %err, "event handling failed; left pending")
        }
      }
    }

    if run_colors {
      if let Err(err) = self.sync_color_rules(false, &BatchControl::default()).await {
        warn!(error = %err, "color rule sync after subject creation failed");
      }
    }
    Ok(completed)
  }

  /// Returns whether a color rule pass should follow.
  async fn handle_event(&self, event: &SubjectEvent) -> Result<bool> {
    match event {
      SubjectEvent::Created { subject_id } => {
        let Some(subject) = self.subject(*subject_id).await? else {
          debug!(%subject_id, "subject removed before its creation event ran");
          return Ok(false);
        };
        let global = self.global_settings().await?;
        let defaults = ConfigValues { opt_out: true, ..global.new_config_values() };
        self.ensure_config(&subject, defaults).await?;
        Ok(global.color_rule_sync_enabled)
      }
    }
  }

  // ── Discovery ─────────────────────────────────────────────────────────────

  /// Create default configurations for groups whose real name is already a
  /// role on the platform. Returns the number created.
  pub async fn discover_subjects(&self) -> Result<usize> {
    let global = self.global_settings().await?;
    let roleset = self.fetch_roleset(true).await?;
    let groups = self
      .store
      .list_subjects(Some(SubjectKind::Group))
      .await
      .map_err(Error::store)?;

    let mut created = 0;
    for group in groups.iter().filter(|g| roleset.role_by_name(&g.name).is_some()) {
      let (_, was_created) = self
        .store
        .get_or_create_config(&group.key(), global.new_config_values())
        .await
        .map_err(Error::store)?;
      if was_created {
        created += 1;
      }
    }

    info!(created, "role discovery finished");
    Ok(created)
  }

  // ── Managed view ──────────────────────────────────────────────────────────

  /// Subjects that have a role on the platform, with their resolved names.
  ///
  /// Creates missing configurations for the subjects listed.
  pub async fn managed_subjects(&self) -> Result<Vec<ManagedSubject>> {
    let global = self.global_settings().await?;
    let roleset = self.fetch_roleset(true).await?;
    let subjects = self.batch_subjects().await?;

    let mut rows = Vec::new();
    for subject in subjects {
      let existing = self.store.get_config(&subject.key()).await.map_err(Error::store)?;
      if !has_role(&subject, existing.as_ref(), &roleset, self.engine()) {
        continue;
      }
      let config = match existing {
        Some(config) => config,
        None => self.ensure_config(&subject, global.new_config_values()).await?,
      };

      let desired_name = resolve_desired_name(&subject.name, Some(&config.values), self.engine());
      let current_role = roleset
        .role_by_name(&desired_name)
        .or_else(|| roleset.role_by_name(&subject.name))
        .map(|role| role.name.clone());
      rows.push(ManagedSubject {
        role_exists: current_role.is_some(),
        subject,
        config,
        desired_name,
        current_role,
      });
    }
    Ok(rows)
  }

  // ── Member role names ─────────────────────────────────────────────────────

  /// Role names the platform integration should give a member with these
  /// groups and state.
  ///
  /// Falls back to the real names when obfuscation is disabled or anything
  /// goes wrong.
  pub async fn member_role_names(&self, groups: &[Subject], state: Option<&str>) -> Vec<String> {
    if !self.engine().enabled {
      return real_names(groups, state);
    }
    match self.obfuscated_role_names(groups, state).await {
      Ok(names) => names,
      Err(err) => {
        warn!(error = %err, "could not obfuscate member role names; using real names");
        real_names(groups, state)
      }
    }
  }

  async fn obfuscated_role_names(
    &self,
    groups: &[Subject],
    state:  Option<&str>,
  ) -> Result<Vec<String>> {
    let engine = self.engine();
    let roleset = self.fetch_roleset(true).await?;
    let mut names = Vec::with_capacity(groups.len() + 1);

    for group in groups {
      let config = self.store.get_config(&group.key()).await.map_err(Error::store)?;
      let resolution = resolve_role_name(&group.name, config.as_ref(), &roleset, engine);
      match resolution.used_name {
        Some(name) => names.push(name),
        None => debug!(group = %group.name, "no matching role; group left out"),
      }
    }

    if let Some(state) = state.filter(|_| engine.include_states) {
      let key = SubjectKey::State(state.to_owned());
      let config = self.store.get_config(&key).await.map_err(Error::store)?;
      let desired = resolve_desired_name(state, config.as_ref().map(|c| &c.values), engine);
      if !engine.require_existing_role || roleset.role_by_name(&desired).is_some() {
        names.push(desired);
      } else {
        debug!(state, "no matching role; state left out");
      }
    }

    Ok(names)
  }
}

fn real_names(groups: &[Subject], state: Option<&str>) -> Vec<String> {
  groups
    .iter()
    .map(|g| g.name.clone())
    .chain(state.map(str::to_owned))
    .collect()
}
