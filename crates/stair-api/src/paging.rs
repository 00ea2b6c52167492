//! Page envelopes and navigation links.

use std::convert::Infallible;

use axum::{
  extract::{FromRequestParts, OriginalUri},
  http::{HeaderMap, header, request::Parts},
};
use serde::{Deserialize, Serialize};
use stair_core::pager::{Page, PageProfile, page_number};

use crate::error::ApiError;

/// `page` and `page_size` as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
  pub page:      Option<String>,
  pub page_size: Option<String>,
}

impl PageParams {
  pub fn size(&self, profile: &PageProfile) -> usize { profile.page_size(self.page_size.as_deref()) }

  /// The validated 1-based page number once the total is known.
  pub fn number(&self, count: usize, size: usize) -> Result<usize, ApiError> {
    Ok(page_number(self.page.as_deref(), count, size)?)
  }
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// The absolute URL of the current request, used to build `next` and
/// `previous` links.
#[derive(Debug, Clone)]
pub struct RequestUrl {
  base:  String,
  /// Query pairs other than `page`, in their original order.
  query: Vec<String>,
}

impl RequestUrl {
  fn from_parts(headers: &HeaderMap, uri: &axum::http::Uri) -> Self {
    let host = headers
      .get(header::HOST)
      .and_then(|v| v.to_str().ok())
      .unwrap_or("localhost");
    let scheme = headers
      .get("x-forwarded-proto")
      .and_then(|v| v.to_str().ok())
      .unwrap_or("http");
    let query = uri
      .query()
      .unwrap_or_default()
      .split('&')
      .filter(|pair| !pair.is_empty() && *pair != "page" && !pair.starts_with("page="))
      .map(str::to_owned)
      .collect();
    Self { base: format!("{scheme}://{host}{}", uri.path()), query }
  }

  /// Link to page `number`. Page 1 drops the parameter entirely.
  pub fn page(&self, number: usize) -> String {
    let mut query = self.query.clone();
    if number > 1 {
      query.push(format!("page={number}"));
    }
    if query.is_empty() {
      self.base.clone()
    } else {
      format!("{}?{}", self.base, query.join("&"))
    }
  }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestUrl {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let uri = match parts.extensions.get::<OriginalUri>() {
      Some(OriginalUri(uri)) => uri.clone(),
      None => parts.uri.clone(),
    };
    Ok(Self::from_parts(&parts.headers, &uri))
  }
}

// ─── Envelopes ───────────────────────────────────────────────────────────────

/// `{count, next, previous, results}`.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
  pub count:    usize,
  pub next:     Option<String>,
  pub previous: Option<String>,
  pub results:  Vec<T>,
}

impl<T> Paginated<T> {
  pub fn new(page: Page<T>, url: &RequestUrl) -> Self {
    let next = page.has_next().then(|| url.page(page.number + 1));
    let previous = page.has_previous().then(|| url.page(page.number - 1));
    Self { count: page.count, next, previous, results: page.results }
  }

  pub fn empty() -> Self { Self { count: 0, next: None, previous: None, results: Vec::new() } }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(uri: &str) -> RequestUrl {
    let mut headers = HeaderMap::new();
    headers.insert(header::HOST, "maps.example".parse().unwrap());
    RequestUrl::from_parts(&headers, &uri.parse().unwrap())
  }

  #[test]
  fn links_replace_the_page_parameter() {
    let u = url("/api/v1/sites?page=2&county=3&page_size=10");
    assert_eq!(u.page(3), "http://maps.example/api/v1/sites?county=3&page_size=10&page=3");
    assert_eq!(u.page(1), "http://maps.example/api/v1/sites?county=3&page_size=10");
  }

  #[test]
  fn envelope_links_follow_page_position() {
    let u = url("/api/v1/images");
    let middle = Paginated::new(Page::new(120, 2, 50, vec![0; 50]), &u);
    assert_eq!(middle.next.as_deref(), Some("http://maps.example/api/v1/images?page=3"));
    assert_eq!(middle.previous.as_deref(), Some("http://maps.example/api/v1/images"));

    let only = Paginated::new(Page::new(3, 1, 50, vec![0; 3]), &u);
    assert!(only.next.is_none());
    assert!(only.previous.is_none());
  }
}
