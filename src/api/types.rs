//! Serde types matching the dashboard service's JSON responses.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Metrics
// ============================================================================

/// Aggregate counts from the latest synced data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
  pub total_universities: u64,
  pub total_researchers: u64,
  pub total_students: u64,
  pub universities_with_tt_hardware: u64,
  pub researchers_on_tt_hardware: u64,
  pub students_on_tt_hardware: u64,
  #[serde(default, deserialize_with = "deserialize_timestamp")]
  pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
  pub date: NaiveDate,
  pub universities: u64,
  pub researchers: u64,
  pub students: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsTimeline {
  #[serde(default)]
  pub data: Vec<TimelinePoint>,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
}

/// Before/after counts and percentage growth over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetrics {
  pub universities_growth: f64,
  pub researchers_growth: f64,
  pub students_growth: f64,
  pub period_days: u32,
  pub current_universities: u64,
  pub current_researchers: u64,
  pub current_students: u64,
  pub previous_universities: u64,
  pub previous_researchers: u64,
  pub previous_students: u64,
}

/// Hardware label to number of universities using it
pub type HardwareDistribution = BTreeMap<String, u64>;

// ============================================================================
// Universities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct University {
  /// Stable external identifier, the entity's primary key
  pub asana_task_gid: String,
  pub university_name: String,
  pub researchers_count: u64,
  pub students_count: u64,
  #[serde(default)]
  pub hardware_types: Vec<String>,
  pub point_of_contact: Option<String>,
  #[serde(deserialize_with = "deserialize_required_timestamp")]
  pub created_at: DateTime<Utc>,
  #[serde(deserialize_with = "deserialize_required_timestamp")]
  pub last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversityList {
  pub universities: Vec<University>,
  pub total: u64,
}

/// One historical snapshot of a university
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversityHistoryEntry {
  pub date: NaiveDate,
  pub researchers_count: u64,
  pub students_count: u64,
  #[serde(default)]
  pub hardware_types: Vec<String>,
}

// ============================================================================
// Sync
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
  Success,
  Failed,
  InProgress,
  #[serde(other)]
  Unknown,
}

/// Read-only projection of the remote sync job state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
  pub is_syncing: bool,
  #[serde(default, deserialize_with = "deserialize_timestamp")]
  pub last_sync_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub last_sync_status: Option<SyncOutcome>,
  #[serde(default)]
  pub last_sync_tasks: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTriggerResponse {
  pub sync_id: u64,
  pub message: String,
  pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
  pub id: u64,
  pub sync_type: String,
  pub status: SyncOutcome,
  pub tasks_synced: u64,
  pub error_message: Option<String>,
  #[serde(deserialize_with = "deserialize_required_timestamp")]
  pub started_at: DateTime<Utc>,
  #[serde(default, deserialize_with = "deserialize_timestamp")]
  pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncHistory {
  pub history: Vec<SyncRun>,
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parse a server timestamp. The service emits naive datetimes for values read
/// back from SQLite and RFC 3339 otherwise; naive values are UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|dt| dt.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  match raw {
    None => Ok(None),
    Some(s) => parse_timestamp(&s)
      .map(Some)
      .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s))),
  }
}

fn deserialize_required_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = String::deserialize(deserializer)?;
  parse_timestamp(&raw)
    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}
