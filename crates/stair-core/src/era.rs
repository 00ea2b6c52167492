//! Historical eras: named year intervals used to colour and filter sites.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Era {
  pub id:             i64,
  pub name_en:        String,
  pub name_ga:        String,
  /// Negative years are BCE.
  pub start_year:     i32,
  pub end_year:       i32,
  pub description_en: String,
  pub description_ga: String,
  pub color_hex:      String,
  pub display_order:  i32,
}

impl Era {
  /// `end_year - start_year`. Not clamped: a malformed era yields a negative
  /// duration rather than an error.
  pub fn duration_years(&self) -> i32 { self.end_year - self.start_year }

  pub fn contains_year(&self, year: i32) -> bool {
    (self.start_year..=self.end_year).contains(&year)
  }
}

/// An era annotated with the number of visible sites that reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
  #[serde(flatten)]
  pub era:            Era,
  pub site_count:     i64,
  pub duration_years: i32,
}

impl TimelineEntry {
  pub fn new(era: Era, site_count: i64) -> Self {
    let duration_years = era.duration_years();
    Self { era, site_count, duration_years }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bronze_age() -> Era {
    Era {
      id:             2,
      name_en:        "Bronze Age".into(),
      name_ga:        "An Chré-Umhaois".into(),
      start_year:     -2500,
      end_year:       -500,
      description_en: String::new(),
      description_ga: String::new(),
      color_hex:      "#CD7F32".into(),
      display_order:  2,
    }
  }

  #[test]
  fn duration_spans_bce_years() {
    assert_eq!(bronze_age().duration_years(), 2000);
  }

  #[test]
  fn contains_year_is_inclusive() {
    let era = bronze_age();
    assert!(era.contains_year(-2500));
    assert!(era.contains_year(-500));
    assert!(!era.contains_year(-499));
  }

  #[test]
  fn inverted_interval_has_negative_duration() {
    let mut era = bronze_age();
    era.end_year = -3000;
    assert_eq!(era.duration_years(), -500);
    assert_eq!(TimelineEntry::new(era, 0).duration_years, -500);
  }
}
