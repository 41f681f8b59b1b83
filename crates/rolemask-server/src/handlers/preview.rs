//! `POST /api/preview`: the name a draft configuration would produce.

use axum::{Json, extract::State};
use rolemask_core::{config::ConfigValues, platform::RoleClient, store::ObfuscationStore};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct PreviewBody {
  /// The subject's real name.
  pub name:   String,
  /// Unsaved values; omitted fields take their defaults.
  #[serde(default)]
  pub config: ConfigValues,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
  pub name: String,
}

/// Touches neither the store nor the platform.
pub async fn handler<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
  Json(body): Json<PreviewBody>,
) -> Result<Json<PreviewResponse>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let name = state.syncer.preview(body.name.trim(), &body.config);
  Ok(Json(PreviewResponse { name }))
}
