//! stair-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `STAIR_*` environment variables, opens the SQLite store and serves the
//! API over HTTP.
//!
//! Nested keys use a double underscore: `STAIR_API__FALLBACK_CAP=100`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use stair_server::ServerConfig;
use stair_store_sqlite::{SqliteStore, StoreOptions};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Stair historical sites API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", env = "STAIR_CONFIG")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("STAIR")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let media_dir = expand_tilde(&server_cfg.media_dir);
  tokio::fs::create_dir_all(&media_dir)
    .await
    .with_context(|| format!("failed to create media directory {media_dir:?}"))?;

  let options = StoreOptions { statement_timeout: server_cfg.statement_timeout() };
  let store = SqliteStore::open(&store_path, options)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::info!(path = ?store_path, timeout_ms = server_cfg.statement_timeout_ms, "opened store");

  let server_cfg = ServerConfig { store_path, media_dir, ..server_cfg };
  let app = stair_server::app(Arc::new(store), &server_cfg).with_context(|| {
    format!("media_url must be an absolute path, got {:?}", server_cfg.media_url)
  })?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
