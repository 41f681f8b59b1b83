//! Handlers for `/api/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/subjects` | Subjects that have a role, with resolved names |
//! | `POST`   | `/api/subjects` | Body: `{"kind":"group","name":"..."}`; queues a creation event |
//! | `DELETE` | `/api/subjects/{id}` | Cascades to the configuration and its color assignment |
//! | `PUT`    | `/api/subjects/{id}/config` | Body: [`ConfigValues`]; validates, saves, syncs on save |
//! | `POST`   | `/api/subjects/{id}/sync` | Sync one subject now |
//! | `POST`   | `/api/member-roles` | Body: `{"groups":[...],"state":"..."}`; external role names |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rolemask_core::{
  config::ConfigValues,
  platform::RoleClient,
  store::ObfuscationStore,
  subject::{NewSubject, Subject, SubjectKind},
};
use rolemask_sync::{ConfigSaved, ManagedSubject};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /api/subjects`
pub async fn list<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
) -> Result<Json<Vec<ManagedSubject>>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  Ok(Json(state.syncer.managed_subjects().await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /api/subjects`
pub async fn create<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
  Json(body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let name = body.name.trim().to_owned();
  if name.is_empty() {
    return Err(ApiError::BadRequest("subject name must not be empty".into()));
  }

  let store = state.syncer.store();
  let existing = store.list_subjects(Some(body.kind)).await.map_err(ApiError::store)?;
  if existing.iter().any(|s| s.name == name) {
    return Err(ApiError::Conflict(format!("{} {name:?} already exists", body.kind)));
  }

  let subject: Subject = store
    .add_subject(NewSubject { kind: body.kind, name })
    .await
    .map_err(ApiError::store)?;
  info!(subject_id = %subject.subject_id, kind = %subject.kind, "subject created");
  Ok((StatusCode::CREATED, Json(subject)))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /api/subjects/{id}`
pub async fn remove<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let deleted = state.syncer.store().delete_subject(id).await.map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("subject {id} not found")));
  }
  info!(subject_id = %id, "subject deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Configuration ────────────────────────────────────────────────────────────

/// `PUT /api/subjects/{id}/config`
pub async fn update_config<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
  Path(id): Path<Uuid>,
  Json(values): Json<ConfigValues>,
) -> Result<Json<ConfigSaved>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  Ok(Json(state.syncer.update_config(id, values).await?))
}

// ─── Sync one ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SyncOutcome {
  pub synced: bool,
}

/// `POST /api/subjects/{id}/sync`
pub async fn sync_one<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SyncOutcome>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  state
    .syncer
    .store()
    .get_subject(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?;

  let synced = state.syncer.sync_subject(id).await?;
  Ok(Json(SyncOutcome { synced }))
}

// ─── Member role names ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MemberRolesBody {
  /// Group subject ids the member belongs to.
  #[serde(default)]
  pub groups: Vec<Uuid>,
  pub state:  Option<String>,
}

/// `POST /api/member-roles`: role names the platform should show for a
/// member. Unknown group ids are ignored.
pub async fn member_roles<S, C>(
  _: Authenticated,
  State(state): State<AppState<S, C>>,
  Json(body): Json<MemberRolesBody>,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let store = state.syncer.store();
  let mut groups = Vec::with_capacity(body.groups.len());
  for id in body.groups {
    match store.get_subject(id).await.map_err(ApiError::store)? {
      Some(subject) if subject.kind == SubjectKind::Group => groups.push(subject),
      _ => {}
    }
  }
  let names = state.syncer.member_role_names(&groups, body.state.as_deref()).await;
  Ok(Json(names))
}
