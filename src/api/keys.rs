//! Query keys for the dashboard service.

use crate::query::QueryKey;
use crate::roster::RosterQuery;

pub const METRICS: &str = "metrics";
pub const UNIVERSITIES: &str = "universities";
pub const SYNC: &str = "sync";

/// Every cacheable read the dashboard issues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DashboardQuery {
  CurrentMetrics,
  /// Timeline covering the last `days` days
  Timeline { days: u32 },
  Growth { period_days: u32 },
  HardwareDistribution,
  /// Filtered, sorted roster
  Universities(RosterQuery),
  University { id: String },
  UniversityHistory { id: String, limit: u32 },
  SyncStatus,
  SyncHistory { limit: u32 },
}

impl DashboardQuery {
  /// Structural cache key. The first component is the resource, which is
  /// what invalidation matches on.
  pub fn key(&self) -> QueryKey {
    match self {
      Self::CurrentMetrics => QueryKey::new(METRICS).with("current"),
      Self::Timeline { days } => QueryKey::new(METRICS).with("timeline").with(*days),
      Self::Growth { period_days } => QueryKey::new(METRICS).with("growth").with(*period_days),
      Self::HardwareDistribution => QueryKey::new(METRICS).with("hardware"),
      Self::Universities(query) => QueryKey::new(UNIVERSITIES)
        .with("list")
        .with(query.search.clone())
        .with(query.sort.as_param())
        .with(query.has_hardware),
      Self::University { id } => QueryKey::new(UNIVERSITIES).with("detail").with(id.as_str()),
      Self::UniversityHistory { id, limit } => QueryKey::new(UNIVERSITIES)
        .with("history")
        .with(id.as_str())
        .with(*limit),
      Self::SyncStatus => QueryKey::new(SYNC).with("status"),
      Self::SyncHistory { limit } => QueryKey::new(SYNC).with("history").with(*limit),
    }
  }

  pub fn description(&self) -> String {
    match self {
      Self::CurrentMetrics => "current metrics".to_string(),
      Self::Timeline { days } => format!("metrics timeline ({} days)", days),
      Self::Growth { period_days } => format!("growth over {} days", period_days),
      Self::HardwareDistribution => "hardware distribution".to_string(),
      Self::Universities(query) => match &query.search {
        Some(search) => format!("universities matching '{}'", search),
        None => "all universities".to_string(),
      },
      Self::University { id } => format!("university {}", id),
      Self::UniversityHistory { id, .. } => format!("history of university {}", id),
      Self::SyncStatus => "sync status".to_string(),
      Self::SyncHistory { .. } => "sync history".to_string(),
    }
  }
}

/// Prefix covering every metrics query
pub fn metrics() -> QueryKey {
  QueryKey::new(METRICS)
}

/// Prefix covering roster, detail and history queries
pub fn universities() -> QueryKey {
  QueryKey::new(UNIVERSITIES)
}

pub fn sync_status() -> QueryKey {
  DashboardQuery::SyncStatus.key()
}

/// Prefix covering sync history queries of any length
pub fn sync_history() -> QueryKey {
  QueryKey::new(SYNC).with("history")
}
