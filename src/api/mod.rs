//! Remote dashboard service: gateway, wire types, query keys and the
//! cache-backed accessors.

mod cached;
mod client;
mod error;
pub mod keys;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use cached::CachedApi;
pub use client::ApiClient;
pub use error::ApiError;

use chrono::NaiveDate;
use futures::future::BoxFuture;

use crate::roster::RosterQuery;
use types::{
  CurrentMetrics, GrowthMetrics, HardwareDistribution, MetricsTimeline, SyncHistory, SyncStatus,
  SyncTriggerResponse, University, UniversityHistoryEntry, UniversityList,
};

/// A boxed, owned future resolving to a typed response
pub type ApiFuture<T> = BoxFuture<'static, Result<T, ApiError>>;

/// One method per logical remote operation.
///
/// Futures are `'static` so they can be handed to the query cache, which
/// drives them on its own task.
pub trait DashboardApi: Send + Sync {
  /// `GET /metrics/current`
  fn current_metrics(&self) -> ApiFuture<CurrentMetrics>;

  /// `GET /metrics/timeline?start_date&end_date`
  fn timeline(&self, start_date: NaiveDate, end_date: NaiveDate) -> ApiFuture<MetricsTimeline>;

  /// `GET /metrics/growth?period_days`
  fn growth(&self, period_days: u32) -> ApiFuture<GrowthMetrics>;

  /// `GET /metrics/hardware-distribution`
  fn hardware_distribution(&self) -> ApiFuture<HardwareDistribution>;

  /// `GET /universities/?search&sort_by&has_tenstorrent`
  fn universities(&self, query: &RosterQuery) -> ApiFuture<UniversityList>;

  /// `GET /universities/{id}`
  fn university(&self, id: &str) -> ApiFuture<University>;

  /// `GET /universities/{id}/history?limit`
  fn university_history(&self, id: &str, limit: u32) -> ApiFuture<Vec<UniversityHistoryEntry>>;

  /// `POST /sync/trigger?create_snapshot`
  fn trigger_sync(&self, create_snapshot: bool) -> ApiFuture<SyncTriggerResponse>;

  /// `GET /sync/status`
  fn sync_status(&self) -> ApiFuture<SyncStatus>;

  /// `GET /sync/history?limit`
  fn sync_history(&self, limit: u32) -> ApiFuture<SyncHistory>;
}
