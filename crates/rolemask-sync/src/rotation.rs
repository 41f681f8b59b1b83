//! Random-key rotation and role repositioning.

use std::collections::HashMap;

use rand::{rngs::OsRng, seq::SliceRandom};
use rolemask_core::{
  config::{ConfigFilter, ObfuscationConfig},
  obfuscate::generate_random_key,
  platform::{RoleClient, RolePosition},
  role::{RoleId, RoleSet},
  settings::GlobalSettings,
  store::ObfuscationStore,
  subject::{Subject, SubjectKey},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result, Syncer, control::BatchControl, retry::Sleeper};

fn default_min_position() -> u32 { 1 }
fn default_max_position() -> u32 { 250 }
fn default_reserved_slots() -> u32 { 2 }

/// Where rotated roles are moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositionSettings {
  /// First position of the block.
  #[serde(default = "default_min_position")]
  pub min_position:   u32,
  /// Highest position the platform allows.
  #[serde(default = "default_max_position")]
  pub max_position:   u32,
  /// Positions kept free below `max_position`.
  #[serde(default = "default_reserved_slots")]
  pub reserved_slots: u32,
}

impl Default for RepositionSettings {
  fn default() -> Self {
    Self {
      min_position:   default_min_position(),
      max_position:   default_max_position(),
      reserved_slots: default_reserved_slots(),
    }
  }
}

/// Lay `ids` out as one contiguous block, in the given order.
///
/// The block starts at `min_position` unless that would run past
/// `max_position - reserved_slots`, in which case it starts as late as still
/// fits. `None` when the block cannot fit even at position 1.
pub fn plan_positions(ids: &[RoleId], settings: &RepositionSettings) -> Option<Vec<RolePosition>> {
  let count = u32::try_from(ids.len()).ok()?;
  if count == 0 {
    return Some(Vec::new());
  }

  let ceiling = settings.max_position.saturating_sub(settings.reserved_slots);
  if count > ceiling {
    return None;
  }
  let start = settings.min_position.max(1).min(ceiling - count + 1);

  Some(
    ids
      .iter()
      .zip(start..)
      .map(|(&id, position)| RolePosition { id, position })
      .collect(),
  )
}

impl<S, C, Z> Syncer<S, C, Z>
where
  S: ObfuscationStore,
  C: RoleClient,
  Z: Sleeper,
{
  /// Give every random-key subject a fresh key, push the new names, and
  /// shuffle the tracked roles into a new contiguous block.
  ///
  /// Without `force` this is a no-op while rotation is disabled in the
  /// global settings. Returns the number of subjects renamed.
  pub async fn rotate_and_reposition(&self, force: bool, control: &BatchControl) -> Result<usize> {
    let global = self.global_settings().await?;
    if !force && !global.random_key_rotation_enabled {
      info!("random key rotation is disabled; skipping");
      return Ok(0);
    }

    let keyed = ConfigFilter { use_random_key: Some(true), ..Default::default() };
    let configs = self.store.list_configs(keyed).await.map_err(Error::store)?;
    if configs.is_empty() {
      return Ok(0);
    }

    let subjects: HashMap<SubjectKey, Subject> = self
      .store
      .list_subjects(None)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|s| (s.key(), s))
      .collect();
    let roleset = self.fetch_roleset(false).await?;

    let mut renamed = 0;
    for config in configs.iter().filter(|c| c.values.rotate_name_on_rotation) {
      if control.should_stop() {
        warn!(renamed, "rotation stopped before finishing");
        break;
      }
      let Some(subject) = subjects.get(&config.subject) else {
        warn!(config_id = %config.config_id, "configuration has no subject; skipping");
        continue;
      };
      match self.rotate_one(subject, config, &roleset, &global).await {
        Ok(true) => renamed += 1,
        Ok(false) => {}
        Err(err) => warn!(subject = %subject.name, error = %err, "rotation failed"),
      }
    }

    if !control.should_stop() {
      // Renames above may have adopted new roles; read tracking again.
      let configs = self.store.list_configs(keyed).await.map_err(Error::store)?;
      self.reposition_tracked(&configs, &roleset).await;
    }

    info!(renamed, "rotation finished");
    Ok(renamed)
  }

  async fn rotate_one(
    &self,
    subject: &Subject,
    config:  &ObfuscationConfig,
    roleset: &RoleSet,
    global:  &GlobalSettings,
  ) -> Result<bool> {
    self
      .store
      .set_random_key(config.config_id, generate_random_key())
      .await
      .map_err(Error::store)?;
    self.sync_one(subject, roleset, global).await
  }

  async fn reposition_tracked(&self, configs: &[ObfuscationConfig], roleset: &RoleSet) {
    let mut ids: Vec<RoleId> = configs
      .iter()
      .filter(|c| c.values.reposition_on_rotation)
      .filter_map(|c| c.tracked_role_id)
      .filter(|id| roleset.contains_id(*id))
      .collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
      return;
    }

    ids.shuffle(&mut OsRng);
    let Some(positions) = plan_positions(&ids, &self.settings.rotation) else {
      warn!(count = ids.len(), "rotated roles do not fit below the position ceiling; skipping");
      return;
    };

    let count = positions.len();
    match self.reposition(positions).await {
      Ok(()) => info!(count, "repositioned rotated roles"),
      Err(err) => warn!(count, error = %err, "reposition failed"),
    }
  }
}
