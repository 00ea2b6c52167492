//! HTTP host for the Stair API.
//!
//! Mounts [`stair_api::api_router`] under `/api/v1`, serves uploaded photos
//! from the media directory and adds health checks and request tracing.

pub mod health;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use serde::Deserialize;
use stair_api::{
  ApiConfig, ApiState, api_router,
  photos::PhotoStore,
  session::{DEFAULT_COOKIE, SessionCookie},
};
use stair_core::store::GeoStore;
use tower_http::{services::ServeDir, trace::TraceLayer};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `STAIR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  /// Directory uploaded photos are written to.
  pub media_dir:            PathBuf,
  /// URL path the media directory is served under.
  pub media_url:            String,
  pub statement_timeout_ms: u64,
  pub session_cookie:       String,
  /// Mark the session cookie `Secure`.
  pub secure_cookies:       bool,
  pub api:                  ApiConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "127.0.0.1".to_owned(),
      port:                 8000,
      store_path:           PathBuf::from("stair.db"),
      media_dir:            PathBuf::from("media"),
      media_url:            "/media".to_owned(),
      statement_timeout_ms: 5_000,
      session_cookie:       DEFAULT_COOKIE.to_owned(),
      secure_cookies:       false,
      api:                  ApiConfig::default(),
    }
  }
}

impl ServerConfig {
  pub fn statement_timeout(&self) -> Duration { Duration::from_millis(self.statement_timeout_ms) }

  /// `media_url` without a trailing slash; it must be an absolute path.
  pub fn media_mount(&self) -> Option<&str> {
    let mount = self.media_url.trim_end_matches('/');
    (mount.starts_with('/') && mount.len() > 1).then_some(mount)
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the complete application router.
///
/// Returns `None` if `config.media_url` is not a mountable path.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> Option<Router>
where
  S: GeoStore + 'static,
{
  let mount = config.media_mount()?;
  let photos = PhotoStore::new(&config.media_dir, mount, config.api.max_photo_bytes);
  let cookie = SessionCookie { name: config.session_cookie.clone(), secure: config.secure_cookies };
  let api = ApiState::new(store.clone(), config.api.clone(), photos, cookie);

  let health = Router::new()
    .route("/health", get(health::service))
    .route("/health/db", get(health::database::<S>))
    .with_state(store);

  Some(
    Router::new()
      .nest("/api/v1", api_router(api))
      .nest_service(mount, ServeDir::new(&config.media_dir))
      .merge(health)
      .layer(TraceLayer::new_for_http()),
  )
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::Value;
  use stair_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn oneshot_raw(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
      .uri(uri)
      .header(header::HOST, "localhost:8000")
      .body(Body::empty())
      .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
  }

  async fn make_app(media: &tempfile::TempDir) -> (Router, SqliteStore) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = ServerConfig { media_dir: media.path().to_path_buf(), ..Default::default() };
    (app(Arc::new(store.clone()), &config).unwrap(), store)
  }

  #[tokio::test]
  async fn health_reports_service_and_database() {
    let media = tempfile::tempdir().unwrap();
    let (router, _) = make_app(&media).await;

    let (status, body) = oneshot_raw(router.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["service"], "stair-server");

    let (status, body) = oneshot_raw(router, "/health/db").await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["database"], "connected");
  }

  #[tokio::test]
  async fn api_is_nested_with_absolute_links() {
    let media = tempfile::tempdir().unwrap();
    let (router, _) = make_app(&media).await;

    let (status, body) = oneshot_raw(router.clone(), "/api/v1/sites").await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["type"], "FeatureCollection");
    assert_eq!(v["count"], 0);

    let (status, body) = oneshot_raw(router, "/api/v1/provinces").await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["features"].as_array().map(Vec::len), Some(0));
  }

  #[tokio::test]
  async fn media_directory_is_served() {
    let media = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(media.path().join("bucket_list")).unwrap();
    std::fs::write(media.path().join("bucket_list/abc.jpg"), b"jpeg").unwrap();
    let (router, _) = make_app(&media).await;

    let (status, body) = oneshot_raw(router, "/media/bucket_list/abc.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"jpeg");
  }

  #[test]
  fn media_url_must_be_a_path() {
    let mut config = ServerConfig::default();
    assert_eq!(config.media_mount(), Some("/media"));
    config.media_url = "/uploads/".into();
    assert_eq!(config.media_mount(), Some("/uploads"));
    config.media_url = "https://cdn.example/media".into();
    assert_eq!(config.media_mount(), None);
    config.media_url = "/".into();
    assert_eq!(config.media_mount(), None);
  }

  #[test]
  fn config_layers_file_over_defaults() {
    let settings = config::Config::builder()
      .add_source(config::File::from_str(
        "port = 9000\nstatement_timeout_ms = 250\n[api]\nfallback_cap = 50\n",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap();
    let cfg: ServerConfig = settings.try_deserialize().unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.statement_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.api.fallback_cap, 50);
    assert_eq!(cfg.api.map_pages.page_size, 100);
    assert_eq!(cfg.session_cookie, "stair_session");
  }
}
