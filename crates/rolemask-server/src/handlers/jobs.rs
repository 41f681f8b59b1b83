//! Handlers that trigger the batch jobs on demand.
//!
//! Jobs started here always run, even when the matching global switch is
//! off, and are bounded by the configured batch limits.

use axum::{Json, extract::State};
use rolemask_core::{platform::RoleClient, store::ObfuscationStore};
use serde::Serialize;

use crate::{AppState, auth::Authenticated, error::ApiError};

/// Number of items the job completed.
#[derive(Debug, Serialize)]
pub struct JobReport {
  pub job:   &'static str,
  pub count: usize,
}

/// `POST /api/sync`
pub async fn sync_all<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
) -> Result<Json<JobReport>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let count = state.syncer.sync_all(&state.batch.control()).await?;
  Ok(Json(JobReport { job: "sync", count }))
}

/// `POST /api/rotate`
pub async fn rotate<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
) -> Result<Json<JobReport>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let count = state.syncer.rotate_and_reposition(true, &state.batch.control()).await?;
  Ok(Json(JobReport { job: "rotate", count }))
}

/// `POST /api/colors/sync`
pub async fn sync_colors<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
) -> Result<Json<JobReport>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let count = state.syncer.sync_color_rules(true, &state.batch.control()).await?;
  Ok(Json(JobReport { job: "colors", count }))
}

/// `POST /api/discover`
pub async fn discover<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
) -> Result<Json<JobReport>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let count = state.syncer.discover_subjects().await?;
  Ok(Json(JobReport { job: "discover", count }))
}
