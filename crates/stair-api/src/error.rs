//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] stair_core::Error),

  /// A request body that could not be decoded.
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("photo exceeds {0} bytes")]
  PayloadTooLarge(usize),

  #[error("photo storage error: {0}")]
  Photo(#[from] std::io::Error),

  /// The session middleware was not installed in front of the route.
  #[error("no session on request")]
  MissingSession,
}

impl ApiError {
  /// Convert a store error into the core taxonomy.
  pub fn store<E: Into<stair_core::Error>>(err: E) -> Self { Self::Core(err.into()) }

  /// True for failures of the store itself rather than of the request.
  pub fn is_upstream(&self) -> bool { matches!(self, Self::Core(stair_core::Error::Upstream(_))) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    use stair_core::Error as Core;

    let (status, body) = match &self {
      ApiError::Core(Core::Validation(m)) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Core(Core::NotFound(m)) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::Core(Core::Duplicate { item_id }) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": "Site already in bucket list", "item_id": item_id }),
      ),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::PayloadTooLarge(_) => {
        (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": self.to_string() }))
      }
      ApiError::Core(Core::Upstream(_)) | ApiError::Photo(_) | ApiError::MissingSession => {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal server error" }))
      }
    };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn duplicate_carries_existing_item_id() {
    let resp = ApiError::Core(stair_core::Error::Duplicate { item_id: 7 }).into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn upstream_is_internal_without_details() {
    let err = ApiError::store(stair_core::Error::upstream(std::io::Error::other("no such table")));
    assert!(err.is_upstream());
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v, json!({ "error": "Internal server error" }));
  }
}
