//! Handlers for `/api/settings`, the persisted global settings record.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/settings` | The stored record, or compiled defaults when never saved |
//! | `PUT`  | `/api/settings` | Body: [`GlobalSettings`]; replaces the record, omitted fields take their defaults |

use axum::{Json, extract::State};
use rolemask_core::{platform::RoleClient, settings::GlobalSettings, store::ObfuscationStore};
use tracing::info;

use crate::{AppState, auth::Authenticated, error::ApiError};

/// `GET /api/settings`
pub async fn get<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
) -> Result<Json<GlobalSettings>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let settings = state.syncer.store().global_settings().await.map_err(ApiError::store)?;
  Ok(Json(settings))
}

/// `PUT /api/settings`
pub async fn update<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
  Json(settings): Json<GlobalSettings>,
) -> Result<Json<GlobalSettings>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  if !settings.default_dividers.is_empty() && settings.default_min_chars_before_divider < 1 {
    return Err(ApiError::BadRequest(
      rolemask_core::Error::MissingDividerWidth.to_string(),
    ));
  }

  let store = state.syncer.store();
  store
    .save_global_settings(settings.clone())
    .await
    .map_err(ApiError::store)?;
  info!(
    periodic_sync = settings.periodic_sync_enabled,
    color_rules = settings.color_rule_sync_enabled,
    rotation = settings.random_key_rotation_enabled,
    sync_on_save = settings.sync_on_save,
    "global settings saved"
  );
  Ok(Json(settings))
}
