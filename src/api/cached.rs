//! Dashboard reads routed through the shared query cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Local};
use tracing::info;

use super::keys::DashboardQuery;
use super::types::{
  CurrentMetrics, GrowthMetrics, HardwareDistribution, MetricsTimeline, SyncHistory, SyncStatus,
  University, UniversityHistoryEntry, UniversityList,
};
use super::{ApiError, ApiFuture, DashboardApi};
use crate::query::{QueryCache, QueryResult};
use crate::roster::RosterQuery;

/// Typed accessors over a `DashboardApi`.
///
/// Each accessor subscribes the caller to one cache entry and returns its
/// current snapshot, starting a fetch only when the entry is missing, stale
/// or invalidated. Render loops call these every frame.
#[derive(Clone)]
pub struct CachedApi {
  api: Arc<dyn DashboardApi>,
  cache: QueryCache,
  stale_time: Duration,
}

impl CachedApi {
  pub fn new(api: Arc<dyn DashboardApi>, cache: QueryCache) -> Self {
    let stale_time = cache.default_stale_time();
    Self {
      api,
      cache,
      stale_time,
    }
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn api(&self) -> Arc<dyn DashboardApi> {
    self.api.clone()
  }

  pub fn current_metrics(&self) -> QueryResult<CurrentMetrics> {
    self.subscribe(DashboardQuery::CurrentMetrics, |api| api.current_metrics())
  }

  /// Timeline for the trailing `days`, ending today.
  pub fn timeline(&self, days: u32) -> QueryResult<MetricsTimeline> {
    self.subscribe(DashboardQuery::Timeline { days }, move |api| {
      let end = Local::now().date_naive();
      let start = end.checked_sub_days(Days::new(u64::from(days))).unwrap_or(end);
      api.timeline(start, end)
    })
  }

  pub fn growth(&self, period_days: u32) -> QueryResult<GrowthMetrics> {
    self.subscribe(DashboardQuery::Growth { period_days }, move |api| {
      api.growth(period_days)
    })
  }

  pub fn hardware_distribution(&self) -> QueryResult<HardwareDistribution> {
    self.subscribe(DashboardQuery::HardwareDistribution, |api| {
      api.hardware_distribution()
    })
  }

  pub fn universities(&self, query: &RosterQuery) -> QueryResult<UniversityList> {
    self.subscribe(DashboardQuery::Universities(query.clone()), |api| {
      api.universities(query)
    })
  }

  pub fn university(&self, id: &str) -> QueryResult<University> {
    let query = DashboardQuery::University { id: id.to_string() };
    self.subscribe(query, |api| api.university(id))
  }

  pub fn university_history(&self, id: &str, limit: u32) -> QueryResult<Vec<UniversityHistoryEntry>> {
    let query = DashboardQuery::UniversityHistory {
      id: id.to_string(),
      limit,
    };
    self.subscribe(query, |api| api.university_history(id, limit))
  }

  pub fn sync_history(&self, limit: u32) -> QueryResult<SyncHistory> {
    self.subscribe(DashboardQuery::SyncHistory { limit }, move |api| {
      api.sync_history(limit)
    })
  }

  /// Force a reload of one university's detail and history, regardless of
  /// freshness.
  pub fn refetch_university(&self, id: &str, limit: u32) {
    let detail = DashboardQuery::University { id: id.to_string() };
    info!(query = %detail.description(), "manual reload");

    let api = self.api.clone();
    let _ = self.cache.refetch::<University, _, _>(
      &detail.key(),
      || api.university(id),
    );

    let api = self.api.clone();
    let history = DashboardQuery::UniversityHistory {
      id: id.to_string(),
      limit,
    };
    let _ = self
      .cache
      .refetch::<Vec<UniversityHistoryEntry>, _, _>(&history.key(), || {
        api.university_history(id, limit)
      });
  }

  /// Wait for current metrics, sharing any in-flight request.
  pub async fn load_current_metrics(&self) -> Result<CurrentMetrics, ApiError> {
    let api = self.api.clone();
    self
      .cache
      .fetch_query(
        &DashboardQuery::CurrentMetrics.key(),
        self.stale_time,
        move || api.current_metrics(),
      )
      .await
  }

  /// Wait for the sync status. Status is never considered fresh.
  pub async fn load_sync_status(&self) -> Result<SyncStatus, ApiError> {
    let api = self.api.clone();
    self
      .cache
      .fetch_query(&DashboardQuery::SyncStatus.key(), Duration::ZERO, move || {
        api.sync_status()
      })
      .await
  }

  fn subscribe<T, F>(&self, query: DashboardQuery, fetch: F) -> QueryResult<T>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce(&dyn DashboardApi) -> ApiFuture<T>,
  {
    let api = self.api.clone();
    self
      .cache
      .subscribe(&query.key(), self.stale_time, move || fetch(api.as_ref()))
  }
}
