//! [`DiscordClient`]: guild role endpoints over `reqwest`.

use std::{
  sync::{Mutex, PoisonError},
  time::{Duration, Instant},
};

use reqwest::{Client, RequestBuilder, Response, StatusCode, header::RETRY_AFTER};
use rolemask_core::{
  platform::{PlatformError, RoleClient, RolePatch, RolePosition},
  role::{ExternalRole, RoleId},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_api_base() -> String { "https://discord.com/api/v10".to_owned() }
fn default_cache_ttl_secs() -> u64 { 60 }

/// Connection settings for the Discord API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
  #[serde(default = "default_api_base")]
  pub api_base:       String,
  pub bot_token:      String,
  pub guild_id:       u64,
  /// How long a role listing may be served from memory.
  #[serde(default = "default_cache_ttl_secs")]
  pub cache_ttl_secs: u64,
}

/// Role listing as returned by `GET /guilds/{id}/roles`.
#[derive(Debug, Deserialize)]
struct RawRole {
  id:       String,
  name:     String,
  #[serde(default)]
  color:    u32,
  #[serde(default)]
  position: i64,
}

impl RawRole {
  fn into_role(self) -> Result<ExternalRole, PlatformError> {
    let id = self
      .id
      .parse()
      .map_err(|_| PlatformError::Decode(format!("invalid role id {:?}", self.id)))?;
    Ok(ExternalRole {
      id,
      name: self.name,
      color: self.color,
      position: u32::try_from(self.position.max(0)).unwrap_or(u32::MAX),
    })
  }
}

/// Body of a 429 response.
#[derive(Debug, Deserialize)]
struct RateLimitBody {
  retry_after: f64,
}

/// Entry of the bulk position update; Discord wants snowflakes as strings.
#[derive(Debug, Serialize)]
struct RawPosition {
  id:       String,
  position: u32,
}

struct CachedRoles {
  fetched_at: Instant,
  roles:      Vec<ExternalRole>,
}

/// A [`RoleClient`] for one guild.
pub struct DiscordClient {
  http:   Client,
  config: DiscordConfig,
  cache:  Mutex<Option<CachedRoles>>,
}

impl DiscordClient {
  pub fn new(config: DiscordConfig) -> Result<Self, PlatformError> {
    let http = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| PlatformError::Transport(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { http, config, cache: Mutex::new(None) })
  }

  pub fn guild_id(&self) -> u64 { self.config.guild_id }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/guilds/{}{}",
      self.config.api_base.trim_end_matches('/'),
      self.config.guild_id,
      path
    )
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    req.header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.config.bot_token))
  }

  async fn send(&self, req: RequestBuilder) -> Result<Response, PlatformError> {
    let resp = self
      .auth(req)
      .send()
      .await
      .map_err(|e| PlatformError::Transport(e.to_string()))?;
    check_status(resp).await
  }

  fn cached_roles(&self) -> Option<Vec<ExternalRole>> {
    let ttl = Duration::from_secs(self.config.cache_ttl_secs);
    let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
    cache
      .as_ref()
      .filter(|c| c.fetched_at.elapsed() < ttl)
      .map(|c| c.roles.clone())
  }

  fn store_roles(&self, roles: Vec<ExternalRole>) {
    let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
    *cache = Some(CachedRoles { fetched_at: Instant::now(), roles });
  }
}

/// Map a non-success response onto [`PlatformError`].
///
/// A 429 takes its reset hint from the JSON body first and the
/// `Retry-After` header second.
async fn check_status(resp: Response) -> Result<Response, PlatformError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }

  if status == StatusCode::TOO_MANY_REQUESTS {
    let header_hint = resp
      .headers()
      .get(RETRY_AFTER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse::<f64>().ok());
    let body_hint = resp.json::<RateLimitBody>().await.ok().map(|b| b.retry_after);
    let retry_after = body_hint.or(header_hint).unwrap_or(1.0);
    return Err(PlatformError::RateLimited { retry_after });
  }

  let message = resp.text().await.unwrap_or_default();
  Err(PlatformError::Status { status: status.as_u16(), message })
}

impl RoleClient for DiscordClient {
  async fn list_roles(&self, use_cache: bool) -> Result<Vec<ExternalRole>, PlatformError> {
    if use_cache {
      if let Some(roles) = self.cached_roles() {
        return Ok(roles);
      }
    }

    let resp = self.send(self.http.get(self.url("/roles"))).await?;
    let raw: Vec<RawRole> = resp
      .json()
      .await
      .map_err(|e| PlatformError::Decode(e.to_string()))?;
    let mut roles = raw
      .into_iter()
      .map(RawRole::into_role)
      .collect::<Result<Vec<_>, _>>()?;
    roles.sort_by_key(|r| (r.position, r.id));
    debug!(count = roles.len(), "fetched guild roles");

    self.store_roles(roles.clone());
    Ok(roles)
  }

  async fn patch_role(&self, role_id: RoleId, patch: RolePatch) -> Result<(), PlatformError> {
    let req = self.http.patch(self.url(&format!("/roles/{role_id}"))).json(&patch);
    self.send(req).await?;
    Ok(())
  }

  async fn reposition_roles(&self, positions: Vec<RolePosition>) -> Result<(), PlatformError> {
    let body: Vec<RawPosition> = positions
      .into_iter()
      .map(|p| RawPosition { id: p.id.to_string(), position: p.position })
      .collect();
    self.send(self.http.patch(self.url("/roles")).json(&body)).await?;
    Ok(())
  }

  fn invalidate_role_cache(&self) {
    self.cache.lock().unwrap_or_else(PoisonError::into_inner).take();
  }
}
