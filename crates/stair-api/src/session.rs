//! Anonymous session identity for the bucket list.
//!
//! The key lives in a cookie. [`session_layer`] accepts it only if the store
//! issued it; otherwise it mints a fresh random key, records it and sets the
//! cookie on the response. The handler receives a [`SessionContext`] through
//! the request extensions and takes it with the [`Session`] extractor.

use axum::{
  extract::{FromRequestParts, Request, State},
  http::{HeaderMap, HeaderValue, header, request::Parts},
  middleware::Next,
  response::{IntoResponse as _, Response},
};
use rand_core::{OsRng, RngCore as _};
use stair_core::{session::SessionContext, store::GeoStore};

use crate::{ApiState, error::ApiError};

pub const DEFAULT_COOKIE: &str = "stair_session";

/// Two weeks, in seconds.
const COOKIE_MAX_AGE: u64 = 14 * 24 * 60 * 60;

/// How the session cookie is named and flagged.
#[derive(Debug, Clone)]
pub struct SessionCookie {
  pub name:   String,
  /// Add the `Secure` attribute (serve over HTTPS only).
  pub secure: bool,
}

impl Default for SessionCookie {
  fn default() -> Self { Self { name: DEFAULT_COOKIE.to_owned(), secure: false } }
}

impl SessionCookie {
  fn header_value(&self, key: &str) -> Option<HeaderValue> {
    let secure = if self.secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
      "{}={key}; Path=/; Max-Age={COOKIE_MAX_AGE}; HttpOnly; SameSite=Lax{secure}",
      self.name
    ))
    .ok()
  }
}

/// A fresh 128-bit key, hex encoded.
pub fn new_session_key() -> String {
  let mut bytes = [0u8; 16];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

fn well_formed(key: &str) -> bool {
  !key.is_empty() && key.len() <= 64 && key.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// The value of cookie `name`, if present and well formed.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v.trim())
    .filter(|v| well_formed(v))
}

/// The presented session if the store knows it.
async fn known_session<S: GeoStore>(
  store: &S,
  presented: Option<&str>,
) -> Result<Option<SessionContext>, ApiError> {
  let Some(key) = presented else {
    return Ok(None);
  };
  let session = SessionContext::new(key);
  if store.session_exists(session.clone()).await.map_err(ApiError::store)? {
    Ok(Some(session))
  } else {
    tracing::debug!(session = session.log_prefix(), "ignoring unknown session cookie");
    Ok(None)
  }
}

/// Middleware: attach a [`SessionContext`], issuing a cookie when needed.
pub async fn session_layer<S: GeoStore>(
  State(state): State<ApiState<S>>,
  mut req: Request,
  next: Next,
) -> Response {
  let cookie = &state.session;
  let presented = cookie_value(req.headers(), &cookie.name);
  let session = match known_session(&*state.store, presented).await {
    Ok(session) => session,
    Err(e) => return e.into_response(),
  };

  let issued = session.is_none();
  let session = match session {
    Some(session) => session,
    None => {
      let session = SessionContext::new(new_session_key());
      if let Err(e) = state.store.register_session(session.clone()).await {
        return ApiError::store(e).into_response();
      }
      tracing::debug!(session = session.log_prefix(), "issued new session");
      session
    }
  };
  let key = session.key().to_owned();
  req.extensions_mut().insert(session);

  let mut resp = next.run(req).await;
  if issued && let Some(value) = cookie.header_value(&key) {
    resp.headers_mut().append(header::SET_COOKIE, value);
  }
  resp
}

/// Extractor for the session attached by [`session_layer`].
pub struct Session(pub SessionContext);

impl<S: Send + Sync> FromRequestParts<S> for Session {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<SessionContext>()
      .cloned()
      .map(Session)
      .ok_or(ApiError::MissingSession)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keys_are_32_hex_chars_and_distinct() {
    let a = new_session_key();
    let b = new_session_key();
    assert_eq!(a.len(), 32);
    assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
  }

  #[test]
  fn cookie_is_found_among_others() {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; stair_session=abc ; x=1"));
    assert_eq!(cookie_value(&headers, "stair_session"), Some("abc"));
    assert_eq!(cookie_value(&headers, "missing"), None);
  }

  #[test]
  fn malformed_cookie_is_ignored() {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_static("stair_session=a%20b"));
    assert_eq!(cookie_value(&headers, "stair_session"), None);
  }

  #[test]
  fn cookie_attributes() {
    let value = SessionCookie { name: "s".into(), secure: true }.header_value("k").unwrap();
    let value = value.to_str().unwrap();
    assert!(value.starts_with("s=k;"));
    assert!(value.contains("HttpOnly"));
    assert!(value.contains("SameSite=Lax"));
    assert!(value.ends_with("; Secure"));
  }
}
