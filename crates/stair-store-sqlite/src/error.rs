//! Error type for `stair-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("geojson error: {0}")]
  GeoJson(#[from] geojson::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored discriminant that no domain enum recognises.
  #[error("unknown {kind} value: {value:?}")]
  UnknownValue { kind: &'static str, value: String },

  /// The statement deadline elapsed and SQLite interrupted the query.
  #[error("statement timed out")]
  Timeout,

  /// The session already has an active bucket-list item for this site.
  #[error("site already in bucket list (item {0})")]
  Duplicate(i64),

  /// The site does not exist, is deleted or is not approved.
  #[error("site not found: {0}")]
  SiteNotFound(i64),
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Rusqlite(ref e) if is_interrupt(e) => Self::Timeout,
      tokio_rusqlite::Error::Other(boxed) => match boxed.downcast::<Error>() {
        Ok(inner) => *inner,
        Err(other) => Self::Database(tokio_rusqlite::Error::Other(other)),
      },
      other => Self::Database(other),
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self {
    if is_interrupt(&err) {
      return Self::Timeout;
    }
    Self::Database(tokio_rusqlite::Error::Rusqlite(err))
  }
}

pub(crate) fn is_interrupt(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::OperationInterrupted
  )
}

/// Wrap a store error so it can cross a `Connection::call` closure boundary.
pub(crate) fn boxed(err: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err))
}

impl From<Error> for stair_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Duplicate(item_id) => Self::Duplicate { item_id },
      Error::SiteNotFound(_) => Self::not_found("Site not found"),
      other => Self::upstream(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
