//! HTTP-level tests against a local mock of the Discord API.

use rolemask_core::{
  color::Color,
  platform::{PlatformError, RoleClient, RolePatch, RolePosition},
};
use serde_json::json;
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{body_json, header, method, path},
};

use crate::{DiscordClient, DiscordConfig};

const GUILD: u64 = 4242;

fn client(server: &MockServer) -> DiscordClient {
  DiscordClient::new(DiscordConfig {
    api_base:       server.uri(),
    bot_token:      "token".into(),
    guild_id:       GUILD,
    cache_ttl_secs: 300,
  })
  .unwrap()
}

fn roles_body() -> serde_json::Value {
  json!([
    { "id": "200", "name": "Ops", "color": 0, "position": 2, "permissions": "0" },
    { "id": "100", "name": "@everyone", "color": 0, "position": 0 },
    { "id": "300", "name": "Eng", "color": 16711680, "position": 1 }
  ])
}

async fn mount_roles(server: &MockServer, expected_calls: u64) {
  Mock::given(method("GET"))
    .and(path(format!("/guilds/{GUILD}/roles")))
    .and(header("Authorization", "Bot token"))
    .respond_with(ResponseTemplate::new(200).set_body_json(roles_body()))
    .expect(expected_calls)
    .mount(server)
    .await;
}

#[tokio::test]
async fn list_roles_parses_and_orders_by_position() {
  let server = MockServer::start().await;
  mount_roles(&server, 1).await;

  let roles = client(&server).list_roles(false).await.unwrap();
  let ids: Vec<_> = roles.iter().map(|r| r.id).collect();
  assert_eq!(ids, [100, 300, 200]);
  assert_eq!(roles[1].name, "Eng");
  assert_eq!(roles[1].color, 0xff0000);
}

#[tokio::test]
async fn cached_listing_is_reused_until_invalidated() {
  let server = MockServer::start().await;
  mount_roles(&server, 3).await;
  let client = client(&server);

  client.list_roles(true).await.unwrap();
  client.list_roles(true).await.unwrap();
  // Bypassing the cache always hits the API.
  client.list_roles(false).await.unwrap();

  client.invalidate_role_cache();
  client.list_roles(true).await.unwrap();
}

#[tokio::test]
async fn rate_limit_hint_comes_from_body() {
  let server = MockServer::start().await;
  Mock::given(method("PATCH"))
    .and(path(format!("/guilds/{GUILD}/roles/200")))
    .respond_with(
      ResponseTemplate::new(429)
        .insert_header("Retry-After", "9")
        .set_body_json(json!({ "message": "You are being rate limited.", "retry_after": 2.5, "global": false })),
    )
    .mount(&server)
    .await;

  let err = client(&server)
    .patch_role(200, RolePatch::rename("x"))
    .await
    .unwrap_err();
  assert!(matches!(err, PlatformError::RateLimited { retry_after } if retry_after == 2.5));
}

#[tokio::test]
async fn rate_limit_hint_falls_back_to_header() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
    .mount(&server)
    .await;

  let err = client(&server).list_roles(false).await.unwrap_err();
  assert!(matches!(err, PlatformError::RateLimited { retry_after } if retry_after == 3.0));
}

#[tokio::test]
async fn patch_sends_only_present_fields() {
  let server = MockServer::start().await;
  Mock::given(method("PATCH"))
    .and(path(format!("/guilds/{GUILD}/roles/200")))
    .and(header("Authorization", "Bot token"))
    .and(body_json(json!({ "name": "abc", "color": 255 })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
    .expect(1)
    .mount(&server)
    .await;

  let patch = RolePatch { name: Some("abc".into()), color: Some(Color::from_rgb(0x0000ff)) };
  client(&server).patch_role(200, patch).await.unwrap();
}

#[tokio::test]
async fn reposition_sends_snowflakes_as_strings() {
  let server = MockServer::start().await;
  Mock::given(method("PATCH"))
    .and(path(format!("/guilds/{GUILD}/roles")))
    .and(body_json(json!([
      { "id": "300", "position": 1 },
      { "id": "200", "position": 2 }
    ])))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
    .expect(1)
    .mount(&server)
    .await;

  let positions = vec![
    RolePosition { id: 300, position: 1 },
    RolePosition { id: 200, position: 2 },
  ];
  client(&server).reposition_roles(positions).await.unwrap();
}

#[tokio::test]
async fn other_failures_map_to_status() {
  let server = MockServer::start().await;
  Mock::given(method("PATCH"))
    .respond_with(ResponseTemplate::new(403).set_body_string("Missing Permissions"))
    .mount(&server)
    .await;

  let err = client(&server)
    .patch_role(1, RolePatch::rename("x"))
    .await
    .unwrap_err();
  match err {
    PlatformError::Status { status, message } => {
      assert_eq!(status, 403);
      assert_eq!(message, "Missing Permissions");
    }
    other => panic!("unexpected error: {other:?}"),
  }
}
