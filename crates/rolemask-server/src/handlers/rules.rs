//! Handlers for `/api/color-rules` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/color-rules` | All rules in execution order, disabled ones included |
//! | `POST`   | `/api/color-rules` | Body: [`NewColorRule`]; 400 on an unusable pattern |
//! | `DELETE` | `/api/color-rules/{id}` | Also drops the rule's assignments |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rolemask_core::{
  color_rule::{ColorRule, NewColorRule, compile_pattern},
  platform::RoleClient,
  store::ObfuscationStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

/// `GET /api/color-rules`
pub async fn list<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
) -> Result<Json<Vec<ColorRule>>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let rules = state
    .syncer
    .store()
    .list_color_rules(false)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rules))
}

/// `POST /api/color-rules`
pub async fn create<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
  Json(mut body): Json<NewColorRule>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  body.pattern = body.pattern.trim().to_owned();
  compile_pattern(&body.pattern, body.case_sensitive)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let rule = state
    .syncer
    .store()
    .add_color_rule(body)
    .await
    .map_err(ApiError::store)?;
  info!(rule_id = %rule.rule_id, pattern = %rule.pattern, "color rule created");
  Ok((StatusCode::CREATED, Json(rule)))
}

/// `DELETE /api/color-rules/{id}`
pub async fn remove<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let deleted = state.syncer.store().delete_color_rule(id).await.map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("color rule {id} not found")));
  }
  Ok(StatusCode::NO_CONTENT)
}
