//! HTTP Basic-auth extractor and standalone verifier.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rolemask_core::{platform::RoleClient, store::ObfuscationStore};

use crate::{AppState, error::ApiError};

/// The administrator account.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Zero-size marker: present in the handler means the request was authenticated.
pub struct Authenticated;

pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), ApiError> {
  let (username, password) = basic_credentials(headers).ok_or(ApiError::Unauthorized)?;
  if username != config.username {
    return Err(ApiError::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash).map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let encoded = headers
    .get(axum::http::header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Basic ")?;
  let decoded = String::from_utf8(B64.decode(encoded).ok()?).ok()?;
  let (username, password) = decoded.split_once(':')?;
  Some((username.to_owned(), password.to_owned()))
}

impl<S, C> FromRequestParts<AppState<S, C>> for Authenticated
where
  S: ObfuscationStore + 'static,
  C: RoleClient + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, C>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth)?;
    Ok(Authenticated)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::{HeaderValue, header};

  fn config(password: &str) -> AuthConfig {
    use argon2::{PasswordHasher, password_hash::SaltString};
    use rand_core::OsRng;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AuthConfig { username: "admin".to_string(), password_hash: hash }
  }

  fn headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[test]
  fn correct_credentials() {
    assert!(verify_auth(&headers(&basic("admin", "secret")), &config("secret")).is_ok());
  }

  #[test]
  fn password_may_contain_colons() {
    let config = config("a:b:c");
    assert!(verify_auth(&headers(&basic("admin", "a:b:c")), &config).is_ok());
  }

  #[test]
  fn wrong_password() {
    let result = verify_auth(&headers(&basic("admin", "wrong")), &config("secret"));
    assert!(matches!(result, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn wrong_username() {
    let result = verify_auth(&headers(&basic("root", "secret")), &config("secret"));
    assert!(matches!(result, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn missing_header() {
    let result = verify_auth(&HeaderMap::new(), &config("secret"));
    assert!(matches!(result, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let result = verify_auth(&headers("Basic !!!not-base64!!!"), &config("secret"));
    assert!(matches!(result, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn unparseable_stored_hash_rejects() {
    let config = AuthConfig { username: "admin".into(), password_hash: "plain".into() };
    let result = verify_auth(&headers(&basic("admin", "plain")), &config);
    assert!(matches!(result, Err(ApiError::Unauthorized)));
  }
}
