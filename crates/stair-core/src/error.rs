//! Error taxonomy shared by every layer of the engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or out-of-range request parameters.
  #[error("{0}")]
  Validation(String),

  /// Unknown, deleted or unapproved record.
  #[error("{0}")]
  NotFound(String),

  /// An active bucket-list item already exists for the (session, site) pair.
  #[error("site already in bucket list (item {item_id})")]
  Duplicate { item_id: i64 },

  /// The geometry store failed or timed out.
  #[error("upstream query failed: {0}")]
  Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

  pub fn not_found(msg: impl Into<String>) -> Self { Self::NotFound(msg.into()) }

  pub fn upstream<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Upstream(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
