//! The anonymous session a bucket list belongs to.

use std::fmt;

/// Opaque session identity, passed explicitly to every bucket-list operation.
///
/// Only the HTTP layer constructs one, from the session cookie. Not
/// deserializable: the key never comes from a request body or query string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionContext {
  key: String,
}

impl SessionContext {
  pub fn new(key: impl Into<String>) -> Self { Self { key: key.into() } }

  pub fn key(&self) -> &str { &self.key }

  /// The first eight characters of the key, safe to write to logs.
  pub fn log_prefix(&self) -> &str {
    match self.key.char_indices().nth(8) {
      Some((idx, _)) => &self.key[..idx],
      None => &self.key,
    }
  }
}

impl fmt::Debug for SessionContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "SessionContext({}…)", self.log_prefix())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn log_prefix_truncates_long_keys() {
    let s = SessionContext::new("0123456789abcdef0123456789abcdef");
    assert_eq!(s.log_prefix(), "01234567");
    assert_eq!(format!("{s:?}"), "SessionContext(01234567…)");
  }

  #[test]
  fn log_prefix_keeps_short_keys() {
    assert_eq!(SessionContext::new("abc").log_prefix(), "abc");
  }
}
