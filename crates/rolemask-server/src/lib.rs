//! Admin HTTP API for rolemask.
//!
//! Exposes an axum [`Router`] over a [`Syncer`] so administrators can manage
//! subjects, edit configurations and global settings, preview names, and
//! trigger the batch jobs.
//! Every route sits behind HTTP Basic auth checked against an argon2 hash.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod worker;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use rolemask_core::{
  color::PaletteSettings, platform::RoleClient, settings::EngineSettings,
  store::ObfuscationStore,
};
use rolemask_discord::DiscordConfig;
use rolemask_sync::{BatchLimits, RepositionSettings, RetryPolicy, SyncSettings, Syncer};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use handlers::{jobs, preview, rules, settings, subjects};
use worker::WorkerConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8470 }
fn default_store_path() -> PathBuf { PathBuf::from("rolemask.db") }

/// Runtime configuration, deserialised from `rolemask.toml` and `ROLEMASK__*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Only required by `serve`.
  #[serde(default)]
  pub admin_username:      String,
  /// argon2 PHC string; see `rolemask hash-password`.
  #[serde(default)]
  pub admin_password_hash: String,
  /// Only required by commands that talk to the platform.
  pub discord:             Option<DiscordConfig>,
  #[serde(default)]
  pub obfuscation:         EngineSettings,
  #[serde(default)]
  pub retry:               RetryPolicy,
  #[serde(default)]
  pub rotation:            RepositionSettings,
  #[serde(default)]
  pub palette:             PaletteSettings,
  #[serde(default)]
  pub batch:               BatchLimits,
  #[serde(default)]
  pub worker:              WorkerConfig,
}

impl ServerConfig {
  pub fn sync_settings(&self) -> SyncSettings {
    SyncSettings {
      obfuscation: self.obfuscation.clone(),
      retry:       self.retry,
      rotation:    self.rotation,
      palette:     self.palette,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, C> {
  pub syncer: Arc<Syncer<S, C>>,
  pub auth:   Arc<AuthConfig>,
  pub batch:  BatchLimits,
}

impl<S, C> Clone for AppState<S, C> {
  fn clone(&self) -> Self {
    Self { syncer: Arc::clone(&self.syncer), auth: Arc::clone(&self.auth), batch: self.batch }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the admin API router, mounted under `/api`.
pub fn router<S, C>(state: AppState<S, C>) -> Router
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  let api = Router::new()
    // Subjects
    .route("/subjects", get(subjects::list::<S, C>).post(subjects::create::<S, C>))
    .route("/subjects/{id}", delete(subjects::remove::<S, C>))
    .route("/subjects/{id}/config", put(subjects::update_config::<S, C>))
    .route("/subjects/{id}/sync", post(subjects::sync_one::<S, C>))
    .route("/member-roles", post(subjects::member_roles::<S, C>))
    // Jobs
    .route("/sync", post(jobs::sync_all::<S, C>))
    .route("/rotate", post(jobs::rotate::<S, C>))
    .route("/colors/sync", post(jobs::sync_colors::<S, C>))
    .route("/discover", post(jobs::discover::<S, C>))
    // Preview
    .route("/preview", post(preview::handler::<S, C>))
    // Global settings
    .route("/settings", get(settings::get::<S, C>).put(settings::update::<S, C>))
    // Color rules
    .route("/color-rules", get(rules::list::<S, C>).post(rules::create::<S, C>))
    .route("/color-rules/{id}", delete(rules::remove::<S, C>));

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
