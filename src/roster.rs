//! Roster query composition: search, sort and hardware filter.
//!
//! Search text is debounced so that typing does not issue one request per
//! keystroke. Sort and filter changes apply immediately.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::api::keys::DashboardQuery;
use crate::query::{Debouncer, QueryKey};

/// Quiet period before typed search text reaches the query
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Column the roster is ordered by. The service sorts descending for counts
/// and dates, ascending for names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortField {
  Name,
  #[default]
  ResearcherCount,
  StudentCount,
  CreatedAt,
}

impl SortField {
  pub const ALL: [SortField; 4] = [
    SortField::Name,
    SortField::ResearcherCount,
    SortField::StudentCount,
    SortField::CreatedAt,
  ];

  /// Value of the `sort_by` request parameter
  pub fn as_param(&self) -> &'static str {
    match self {
      SortField::Name => "university_name",
      SortField::ResearcherCount => "researchers_count",
      SortField::StudentCount => "students_count",
      SortField::CreatedAt => "created_at",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      SortField::Name => "University Name",
      SortField::ResearcherCount => "Researchers",
      SortField::StudentCount => "Students",
      SortField::CreatedAt => "Date Added",
    }
  }

  /// The field after this one, wrapping around.
  pub fn next(&self) -> SortField {
    let idx = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

/// Effective roster parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RosterQuery {
  /// Trimmed, non-empty search text, or None for no search filter
  pub search: Option<String>,
  pub sort: SortField,
  /// Only universities with at least one hardware type
  pub has_hardware: bool,
}

impl Default for RosterQuery {
  fn default() -> Self {
    Self {
      search: None,
      sort: SortField::default(),
      has_hardware: true,
    }
  }
}

impl RosterQuery {
  pub fn key(&self) -> QueryKey {
    DashboardQuery::Universities(self.clone()).key()
  }
}

/// Empty or whitespace-only text means "no search filter".
pub fn normalize_search(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed.to_string())
  }
}

/// Turns raw user input into the effective `RosterQuery`.
#[derive(Debug, Clone)]
pub struct RosterComposer {
  raw_search: String,
  pending: Debouncer<String>,
  query: RosterQuery,
}

impl RosterComposer {
  pub fn new(debounce: Duration) -> Self {
    Self {
      raw_search: String::new(),
      pending: Debouncer::new(debounce),
      query: RosterQuery::default(),
    }
  }

  /// The effective query, as last settled.
  pub fn query(&self) -> &RosterQuery {
    &self.query
  }

  pub fn key(&self) -> QueryKey {
    self.query.key()
  }

  /// Search text as typed, shown in the input even before it settles.
  pub fn raw_search(&self) -> &str {
    &self.raw_search
  }

  /// Record new search text. It reaches the query after the debounce
  /// period passes with no further input.
  pub fn set_search(&mut self, raw: impl Into<String>) {
    let raw = raw.into();
    self.raw_search = raw.clone();
    self.pending.push(raw);
  }

  /// Returns true if the query changed.
  pub fn set_sort(&mut self, sort: SortField) -> bool {
    if self.query.sort == sort {
      return false;
    }
    debug!(sort = sort.as_param(), "roster sort changed");
    self.query.sort = sort;
    true
  }

  /// Returns true if the query changed.
  pub fn set_hardware_filter(&mut self, enabled: bool) -> bool {
    if self.query.has_hardware == enabled {
      return false;
    }
    debug!(enabled, "roster hardware filter changed");
    self.query.has_hardware = enabled;
    true
  }

  pub fn toggle_hardware_filter(&mut self) -> bool {
    self.set_hardware_filter(!self.query.has_hardware)
  }

  /// Apply debounced search text if its quiet period has elapsed.
  /// Returns true if the query changed.
  pub fn tick(&mut self) -> bool {
    let Some(raw) = self.pending.poll() else {
      return false;
    };
    let search = normalize_search(&raw);
    if search == self.query.search {
      return false;
    }
    debug!(search = ?search, "roster search settled");
    self.query.search = search;
    true
  }

  /// When pending search text becomes effective.
  pub fn deadline(&self) -> Option<Instant> {
    self.pending.deadline()
  }

  pub fn is_search_pending(&self) -> bool {
    self.pending.is_pending()
  }

  /// Drop the search filter right away, discarding any pending text.
  /// Returns true if the query changed.
  pub fn clear_search(&mut self) -> bool {
    self.pending.cancel();
    self.raw_search.clear();
    if self.query.search.is_none() {
      return false;
    }
    debug!("roster search cleared");
    self.query.search = None;
    true
  }
}

impl Default for RosterComposer {
  fn default() -> Self {
    Self::new(SEARCH_DEBOUNCE)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::FakeApi;
  use crate::api::CachedApi;
  use crate::query::QueryCache;
  use std::sync::Arc;

  const STEP: Duration = Duration::from_millis(10);

  async fn settle() {
    for _ in 0..5 {
      tokio::task::yield_now().await;
    }
  }

  /// One render frame: apply debounced input, then read the roster.
  async fn frame(composer: &mut RosterComposer, api: &CachedApi) {
    composer.tick();
    api.universities(composer.query());
    settle().await;
  }

  #[test]
  fn test_normalize_search() {
    assert_eq!(normalize_search(""), None);
    assert_eq!(normalize_search("   "), None);
    assert_eq!(normalize_search("  MIT "), Some("MIT".to_string()));
  }

  #[test]
  fn test_sort_field_cycle() {
    let mut field = SortField::default();
    let mut seen = Vec::new();
    for _ in 0..SortField::ALL.len() {
      seen.push(field);
      field = field.next();
    }
    assert_eq!(field, SortField::default());
    assert_eq!(seen.len(), 4);
    assert!(SortField::ALL.iter().all(|f| seen.contains(f)));
  }

  #[tokio::test(start_paused = true)]
  async fn test_typing_issues_single_request() {
    let fake = Arc::new(FakeApi::new());
    let api = CachedApi::new(fake.clone(), QueryCache::new(Duration::from_secs(300)));
    let mut composer = RosterComposer::default();

    frame(&mut composer, &api).await;
    assert_eq!(fake.count("universities:-:"), 1);

    for text in ["M", "MI", "MIT"] {
      composer.set_search(text);
      for _ in 0..5 {
        tokio::time::advance(STEP).await;
        frame(&mut composer, &api).await;
      }
    }
    assert_eq!(composer.query().search, None);
    assert_eq!(composer.raw_search(), "MIT");

    for _ in 0..40 {
      tokio::time::advance(STEP).await;
      frame(&mut composer, &api).await;
    }

    assert_eq!(composer.query().search.as_deref(), Some("MIT"));
    assert_eq!(fake.count("universities:MIT:"), 1);
    assert_eq!(fake.count("universities:M:"), 0);
    assert_eq!(fake.count("universities:MI:"), 0);
    assert_eq!(fake.count("universities:"), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_cleared_search_matches_untouched_key() {
    let untouched = RosterComposer::default().key();
    let mut composer = RosterComposer::default();

    composer.set_search("MIT");
    tokio::time::advance(SEARCH_DEBOUNCE).await;
    assert!(composer.tick());
    assert_ne!(composer.key(), untouched);

    composer.set_search("   ");
    tokio::time::advance(SEARCH_DEBOUNCE).await;
    assert!(composer.tick());
    assert_eq!(composer.key(), untouched);
  }

  #[tokio::test(start_paused = true)]
  async fn test_sort_and_filter_apply_immediately() {
    let mut composer = RosterComposer::default();
    let before = composer.key();

    assert!(composer.set_sort(SortField::Name));
    assert_eq!(composer.query().sort, SortField::Name);
    assert_ne!(composer.key(), before);
    assert!(!composer.set_sort(SortField::Name));

    assert!(composer.toggle_hardware_filter());
    assert!(!composer.query().has_hardware);
    assert!(composer.deadline().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_switching_back_reuses_cached_roster() {
    let fake = Arc::new(FakeApi::new());
    let api = CachedApi::new(fake.clone(), QueryCache::new(Duration::from_secs(300)));
    let mut composer = RosterComposer::default();

    frame(&mut composer, &api).await;
    composer.set_sort(SortField::StudentCount);
    frame(&mut composer, &api).await;
    composer.set_sort(SortField::ResearcherCount);
    frame(&mut composer, &api).await;

    assert_eq!(fake.count("universities:-:researchers_count"), 1);
    assert_eq!(fake.count("universities:-:students_count"), 1);
    assert!(api.universities(composer.query()).data().is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn test_clear_search_is_immediate() {
    let mut composer = RosterComposer::default();
    composer.set_search("Stan");
    tokio::time::advance(SEARCH_DEBOUNCE).await;
    assert!(composer.tick());

    composer.set_search("Stanf");
    assert!(composer.clear_search());
    assert_eq!(composer.key(), RosterComposer::default().key());
    assert_eq!(composer.raw_search(), "");

    tokio::time::advance(SEARCH_DEBOUNCE).await;
    assert!(!composer.tick());
    assert!(!composer.clear_search());
  }
}
