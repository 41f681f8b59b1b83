//! Background jobs run by `serve`: the subject event outbox and, when the
//! global switches allow it, periodic sync, rotation and color passes.

use std::{sync::Arc, time::Duration};

use rolemask_core::{platform::RoleClient, store::ObfuscationStore};
use rolemask_sync::{BatchLimits, Syncer};
use serde::Deserialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

fn default_outbox_interval_secs() -> u64 { 5 }
fn default_outbox_batch() -> usize { 100 }
fn default_sync_interval_secs() -> u64 { 3600 }

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WorkerConfig {
  #[serde(default = "default_outbox_interval_secs")]
  pub outbox_interval_secs: u64,
  /// Events consumed per outbox pass.
  #[serde(default = "default_outbox_batch")]
  pub outbox_batch:         usize,
  /// Period of the scheduled sync pass.
  #[serde(default = "default_sync_interval_secs")]
  pub sync_interval_secs:   u64,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      outbox_interval_secs: default_outbox_interval_secs(),
      outbox_batch:         default_outbox_batch(),
      sync_interval_secs:   default_sync_interval_secs(),
    }
  }
}

/// Spawn the background loops. They run until the runtime shuts down.
pub fn spawn<S, C>(syncer: Arc<Syncer<S, C>>, config: WorkerConfig, batch: BatchLimits)
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let outbox = Arc::clone(&syncer);
  tokio::spawn(async move {
    let mut interval = tokio::time::interval(Duration::from_secs(config.outbox_interval_secs.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
      interval.tick().await;
      match outbox.process_outbox(config.outbox_batch).await {
        Ok(0) => {}
        Ok(completed) => debug!(completed, "processed subject events"),
        Err(err) => warn!(error = %err, "outbox pass failed"),
      }
    }
  });

  tokio::spawn(async move {
    let mut interval = tokio::time::interval(Duration::from_secs(config.sync_interval_secs.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; skip it so startup stays quiet.
    interval.tick().await;
    loop {
      interval.tick().await;
      scheduled_pass(&syncer, batch).await;
    }
  });
}

/// One scheduled run. Each job checks its own global switch.
pub async fn scheduled_pass<S, C>(syncer: &Syncer<S, C>, batch: BatchLimits)
where
  S: ObfuscationStore,
  C: RoleClient,
{
  let global = match syncer.store().global_settings().await {
    Ok(global) => global,
    Err(err) => {
      warn!(error = %err, "could not read global settings; scheduled pass skipped");
      return;
    }
  };

  if global.periodic_sync_enabled {
    match syncer.sync_all(&batch.control()).await {
      Ok(synced) => info!(synced, "scheduled sync finished"),
      Err(err) => warn!(error = %err, "scheduled sync failed"),
    }
  }
  if let Err(err) = syncer.rotate_and_reposition(false, &batch.control()).await {
    warn!(error = %err, "scheduled rotation failed");
  }
  if let Err(err) = syncer.sync_color_rules(false, &batch.control()).await {
    warn!(error = %err, "scheduled color rule sync failed");
  }
}
