//! Memory-bounded offset pagination.
//!
//! Every list query carries a [`Window`]; nothing is ever fetched without an
//! upper bound. A request resolves in two steps: the page size is fixed from
//! the profile before anything is counted, and the page number is validated
//! once the total row count is known.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Hard truncation applied where a result set is not paginated.
pub const FALLBACK_CAP: usize = 200;

// ─── Profiles ────────────────────────────────────────────────────────────────

/// Default and maximum page sizes for a family of endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageProfile {
  pub page_size:     usize,
  pub max_page_size: usize,
}

impl PageProfile {
  /// Images and bucket lists.
  pub const STANDARD: PageProfile = PageProfile { page_size: 50, max_page_size: 200 };
  /// Map layers: site list, viewport and filtered searches.
  pub const MAP: PageProfile = PageProfile { page_size: 100, max_page_size: 200 };

  /// Resolve the `page_size` query parameter.
  ///
  /// Sizes above the maximum are clamped. Missing, zero, negative or
  /// unparsable values fall back to the profile default.
  pub fn page_size(&self, requested: Option<&str>) -> usize {
    match requested.and_then(|s| s.trim().parse::<usize>().ok()) {
      Some(0) | None => self.page_size,
      Some(n) => n.min(self.max_page_size),
    }
  }
}

// ─── Windows ─────────────────────────────────────────────────────────────────

/// The `LIMIT`/`OFFSET` pair pushed down to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
  pub offset: usize,
  pub limit:  usize,
}

impl Window {
  /// The first `limit` rows.
  pub fn first(limit: usize) -> Self { Self { offset: 0, limit } }

  /// Page `number` (1-based) of `size` rows.
  pub fn page(number: usize, size: usize) -> Self {
    Self { offset: number.saturating_sub(1).saturating_mul(size), limit: size }
  }
}

impl Default for Window {
  fn default() -> Self { Self::first(FALLBACK_CAP) }
}

/// Number of pages needed for `count` rows. An empty result still has one
/// (empty) page.
pub fn page_count(count: usize, size: usize) -> usize {
  if count == 0 || size == 0 {
    return 1;
  }
  count.div_ceil(size)
}

/// Validate the `page` query parameter against the total row count.
///
/// Accepts a 1-based integer or `last`. Anything else, including a page past
/// the end, is [`Error::NotFound`].
pub fn page_number(requested: Option<&str>, count: usize, size: usize) -> Result<usize> {
  let pages = page_count(count, size);
  let number = match requested.map(str::trim) {
    None | Some("") => 1,
    Some("last") => pages,
    Some(s) => s.parse::<usize>().map_err(|_| invalid_page())?,
  };
  if number == 0 || number > pages {
    return Err(invalid_page());
  }
  Ok(number)
}

fn invalid_page() -> Error { Error::not_found("Invalid page.") }

// ─── Pages ───────────────────────────────────────────────────────────────────

/// One page of results plus what is needed to build navigation links.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub count:   usize,
  pub number:  usize,
  pub size:    usize,
  pub results: Vec<T>,
}

impl<T> Page<T> {
  pub fn new(count: usize, number: usize, size: usize, results: Vec<T>) -> Self {
    Self { count, number, size, results }
  }

  /// The degraded page served when a list cannot be assembled.
  pub fn empty() -> Self { Self { count: 0, number: 1, size: 0, results: Vec::new() } }

  pub fn has_next(&self) -> bool { self.number < page_count(self.count, self.size) }

  pub fn has_previous(&self) -> bool { self.number > 1 }

  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      count:   self.count,
      number:  self.number,
      size:    self.size,
      results: self.results.into_iter().map(f).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_size_defaults_and_clamps() {
    let p = PageProfile::MAP;
    assert_eq!(p.page_size(None), 100);
    assert_eq!(p.page_size(Some("25")), 25);
    assert_eq!(p.page_size(Some("5000")), 200);
    assert_eq!(p.page_size(Some("0")), 100);
    assert_eq!(p.page_size(Some("-3")), 100);
    assert_eq!(p.page_size(Some("lots")), 100);
  }

  #[test]
  fn standard_profile_default() {
    assert_eq!(PageProfile::STANDARD.page_size(None), 50);
    assert_eq!(PageProfile::STANDARD.page_size(Some("201")), 200);
  }

  #[test]
  fn window_for_page() {
    assert_eq!(Window::page(1, 50), Window { offset: 0, limit: 50 });
    assert_eq!(Window::page(3, 50), Window { offset: 100, limit: 50 });
  }

  #[test]
  fn first_page_of_empty_result_is_valid() {
    assert_eq!(page_number(None, 0, 50).unwrap(), 1);
    assert_eq!(page_number(Some("1"), 0, 50).unwrap(), 1);
  }

  #[test]
  fn page_past_the_end_is_not_found() {
    assert!(matches!(page_number(Some("3"), 101, 50), Ok(3)));
    assert!(matches!(page_number(Some("4"), 101, 50), Err(Error::NotFound(_))));
    assert!(matches!(page_number(Some("0"), 101, 50), Err(Error::NotFound(_))));
    assert!(matches!(page_number(Some("two"), 101, 50), Err(Error::NotFound(_))));
  }

  #[test]
  fn last_resolves_to_final_page() {
    assert_eq!(page_number(Some("last"), 101, 50).unwrap(), 3);
  }

  #[test]
  fn navigation_flags() {
    let page = Page::new(101, 2, 50, vec![(); 50]);
    assert!(page.has_next());
    assert!(page.has_previous());

    let last = Page::new(101, 3, 50, vec![()]);
    assert!(!last.has_next());

    let empty: Page<()> = Page::empty();
    assert!(!empty.has_next());
    assert!(!empty.has_previous());
  }
}
