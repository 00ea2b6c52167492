//! The per-session bucket list and its wishlist/visited state machine.
//!
//! Transitions are applied by [`BucketListItem::apply`], which is pure; the
//! store loads the item, applies the action and persists the result in one
//! transaction.

use std::{collections::BTreeMap, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  pager::Window,
  site::{Location, SiteType},
  stats::NamedCount,
  Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketStatus {
  #[default]
  Wishlist,
  Visited,
}

impl BucketStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Wishlist => "wishlist",
      Self::Visited => "visited",
    }
  }
}

impl FromStr for BucketStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "wishlist" => Ok(Self::Wishlist),
      "visited" => Ok(Self::Visited),
      other => Err(Error::validation(format!("status: \"{other}\" is not a valid choice."))),
    }
  }
}

/// A stored photo, addressed by the hash of its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
  /// Path relative to the media root, e.g. `bucket_list/<hash>.jpg`.
  pub path:         String,
  pub content_hash: String,
  pub media_type:   String,
}

/// The site fields shown alongside a bucket-list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSite {
  pub id:          i64,
  pub name_en:     String,
  pub name_ga:     String,
  pub site_type:   SiteType,
  pub county_name: Option<String>,
  pub era_name:    Option<String>,
  pub location:    Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketListItem {
  pub id:            i64,
  pub site:          BucketSite,
  pub status:        BucketStatus,
  pub added_at:      DateTime<Utc>,
  /// Set exactly when `status` is [`BucketStatus::Visited`].
  pub visited_at:    Option<DateTime<Utc>>,
  pub photo:         Option<PhotoRef>,
  pub photo_caption: String,
  pub updated_at:    DateTime<Utc>,
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// Input for creating an item. The session comes from the caller's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewBucketItem {
  pub site_id: i64,
  pub status:  BucketStatus,
}

impl NewBucketItem {
  /// `visited_at` for a freshly created item.
  pub fn initial_visited_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match self.status {
      BucketStatus::Visited => Some(now),
      BucketStatus::Wishlist => None,
    }
  }
}

/// A partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketPatch {
  pub status:        Option<BucketStatus>,
  pub photo:         Option<PhotoRef>,
  pub photo_caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BucketAction {
  Update(BucketPatch),
  MarkVisited { photo: Option<PhotoRef>, photo_caption: Option<String> },
  ToggleStatus,
}

impl BucketListItem {
  fn set_status(&mut self, status: BucketStatus, now: DateTime<Utc>) {
    self.status = status;
    match status {
      BucketStatus::Visited => {
        self.visited_at.get_or_insert(now);
      }
      // Any route back to wishlist, PATCH included, drops the visit time so
      // `visited_at` is set exactly when the item is visited.
      BucketStatus::Wishlist => self.visited_at = None,
    }
  }

  fn attach(&mut self, photo: Option<PhotoRef>, caption: Option<String>) {
    if let Some(photo) = photo {
      self.photo = Some(photo);
    }
    if let Some(caption) = caption {
      self.photo_caption = caption;
    }
  }

  /// Apply `action` at time `now`.
  ///
  /// Becoming visited stamps `visited_at` only if it is unset; becoming a
  /// wishlist entry clears it. Photo and caption edits never touch it.
  pub fn apply(&mut self, action: BucketAction, now: DateTime<Utc>) {
    match action {
      BucketAction::Update(patch) => {
        if let Some(status) = patch.status {
          self.set_status(status, now);
        }
        self.attach(patch.photo, patch.photo_caption);
      }
      BucketAction::MarkVisited { photo, photo_caption } => {
        self.set_status(BucketStatus::Visited, now);
        self.attach(photo, photo_caption);
      }
      BucketAction::ToggleStatus => {
        let next = match self.status {
          BucketStatus::Wishlist => BucketStatus::Visited,
          BucketStatus::Visited => BucketStatus::Wishlist,
        };
        self.set_status(next, now);
      }
    }
    self.updated_at = now;
  }
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketOrderField {
  AddedAt,
  VisitedAt,
  Status,
}

impl BucketOrderField {
  pub fn column(self) -> &'static str {
    match self {
      Self::AddedAt => "added_at",
      Self::VisitedAt => "visited_at",
      Self::Status => "status",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketOrder {
  pub field:      BucketOrderField,
  pub descending: bool,
}

/// Parse an `ordering` parameter. Blank input means newest first.
pub fn parse_bucket_ordering(raw: Option<&str>) -> Result<Vec<BucketOrder>> {
  let mut keys = Vec::new();
  for part in raw.unwrap_or_default().split(',').map(str::trim).filter(|s| !s.is_empty()) {
    let (descending, name) = match part.strip_prefix('-') {
      Some(rest) => (true, rest),
      None => (false, part),
    };
    let field = match name {
      "added_at" => BucketOrderField::AddedAt,
      "visited_at" => BucketOrderField::VisitedAt,
      "status" => BucketOrderField::Status,
      other => return Err(Error::validation(format!("Unknown ordering field: {other}"))),
    };
    keys.push(BucketOrder { field, descending });
  }
  if keys.is_empty() {
    keys.push(BucketOrder { field: BucketOrderField::AddedAt, descending: true });
  }
  Ok(keys)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketQuery {
  pub status: Option<BucketStatus>,
  pub order:  Vec<BucketOrder>,
  pub window: Window,
}

impl Default for BucketQuery {
  fn default() -> Self {
    Self {
      status: None,
      order:  vec![BucketOrder { field: BucketOrderField::AddedAt, descending: true }],
      window: Window::default(),
    }
  }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStatistics {
  pub total:             i64,
  pub wishlist:          i64,
  pub visited:           i64,
  /// Distinct counties among visited items.
  pub counties_explored: i64,
  /// Descending by count.
  pub by_county:         Vec<NamedCount>,
  pub by_site_type:      BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(h: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap() }

  fn item(status: BucketStatus, visited_at: Option<DateTime<Utc>>) -> BucketListItem {
    BucketListItem {
      id: 1,
      site: BucketSite {
        id:          42,
        name_en:     "Rock of Cashel".into(),
        name_ga:     "Carraig Phádraig".into(),
        site_type:   SiteType::Castle,
        county_name: Some("Tipperary".into()),
        era_name:    None,
        location:    Location { longitude: -7.8857, latitude: 52.5200, elevation: None },
      },
      status,
      added_at: at(8),
      visited_at,
      photo: None,
      photo_caption: String::new(),
      updated_at: at(8),
    }
  }

  fn photo() -> PhotoRef {
    PhotoRef {
      path:         "bucket_list/abc.jpg".into(),
      content_hash: "abc".into(),
      media_type:   "image/jpeg".into(),
    }
  }

  #[test]
  fn created_visited_is_stamped() {
    let new = NewBucketItem { site_id: 42, status: BucketStatus::Visited };
    assert_eq!(new.initial_visited_at(at(9)), Some(at(9)));
    let new = NewBucketItem { site_id: 42, status: BucketStatus::Wishlist };
    assert_eq!(new.initial_visited_at(at(9)), None);
  }

  #[test]
  fn mark_visited_stamps_and_attaches() {
    let mut i = item(BucketStatus::Wishlist, None);
    i.apply(
      BucketAction::MarkVisited { photo: Some(photo()), photo_caption: Some("Sunny".into()) },
      at(10),
    );
    assert_eq!(i.status, BucketStatus::Visited);
    assert_eq!(i.visited_at, Some(at(10)));
    assert_eq!(i.photo, Some(photo()));
    assert_eq!(i.photo_caption, "Sunny");
    assert_eq!(i.updated_at, at(10));
  }

  #[test]
  fn mark_visited_keeps_existing_timestamp() {
    let mut i = item(BucketStatus::Visited, Some(at(9)));
    i.apply(BucketAction::MarkVisited { photo: None, photo_caption: None }, at(11));
    assert_eq!(i.visited_at, Some(at(9)));
  }

  #[test]
  fn toggle_round_trip_clears_timestamp() {
    let mut i = item(BucketStatus::Wishlist, None);
    i.apply(BucketAction::ToggleStatus, at(10));
    assert_eq!((i.status, i.visited_at), (BucketStatus::Visited, Some(at(10))));
    i.apply(BucketAction::ToggleStatus, at(11));
    assert_eq!((i.status, i.visited_at), (BucketStatus::Wishlist, None));
  }

  #[test]
  fn patch_to_wishlist_clears_timestamp() {
    let mut i = item(BucketStatus::Visited, Some(at(9)));
    i.apply(
      BucketAction::Update(BucketPatch { status: Some(BucketStatus::Wishlist), ..Default::default() }),
      at(10),
    );
    assert_eq!(i.visited_at, None);
  }

  #[test]
  fn caption_edit_leaves_timestamp_alone() {
    let mut i = item(BucketStatus::Visited, Some(at(9)));
    i.apply(
      BucketAction::Update(BucketPatch { photo_caption: Some("Again".into()), ..Default::default() }),
      at(12),
    );
    assert_eq!(i.status, BucketStatus::Visited);
    assert_eq!(i.visited_at, Some(at(9)));
    assert_eq!(i.photo_caption, "Again");
  }

  #[test]
  fn ordering_defaults_to_newest_first() {
    assert_eq!(
      parse_bucket_ordering(None).unwrap(),
      vec![BucketOrder { field: BucketOrderField::AddedAt, descending: true }]
    );
    assert_eq!(
      parse_bucket_ordering(Some("status,-visited_at")).unwrap(),
      vec![
        BucketOrder { field: BucketOrderField::Status, descending: false },
        BucketOrder { field: BucketOrderField::VisitedAt, descending: true },
      ]
    );
    assert!(parse_bucket_ordering(Some("site")).is_err());
  }

  #[test]
  fn status_parses() {
    assert_eq!("visited".parse::<BucketStatus>().unwrap(), BucketStatus::Visited);
    assert!("done".parse::<BucketStatus>().is_err());
  }
}
