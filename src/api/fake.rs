//! In-memory `DashboardApi` for tests. Records every call and can hold or
//! fail individual operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{NaiveDate, TimeZone, Utc};
use futures::FutureExt;
use tokio::sync::oneshot;

use super::types::*;
use super::{ApiError, ApiFuture, DashboardApi};
use crate::roster::RosterQuery;

#[derive(Default)]
pub struct FakeApi {
  calls: Mutex<Vec<String>>,
  /// Value reported by `sync_status`. A successful trigger sets it.
  pub syncing: AtomicBool,
  pub fail_trigger: AtomicBool,
  pub fail_status: AtomicBool,
  trigger_gate: Mutex<Option<oneshot::Receiver<()>>>,
  status_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeApi {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of recorded calls whose description starts with `prefix`.
  pub fn count(&self, prefix: &str) -> usize {
    self.calls().iter().filter(|c| c.starts_with(prefix)).count()
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().map(|c| c.clone()).unwrap_or_default()
  }

  /// Make the next trigger wait until the returned sender fires.
  pub fn hold_trigger(&self) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel();
    *self.trigger_gate.lock().unwrap() = Some(rx);
    tx
  }

  /// Make the next status read wait until the returned sender fires. The
  /// reported value is the one current when the read was issued.
  pub fn hold_status(&self) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel();
    *self.status_gate.lock().unwrap() = Some(rx);
    tx
  }

  fn record(&self, call: String) {
    self.calls.lock().unwrap().push(call);
  }
}

pub fn university(id: &str, name: &str) -> University {
  let at = Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap();
  University {
    asana_task_gid: id.to_string(),
    university_name: name.to_string(),
    researchers_count: 12,
    students_count: 1500,
    hardware_types: vec!["Wormhole".to_string()],
    point_of_contact: Some("Dr. Ada".to_string()),
    created_at: at,
    last_synced_at: at,
  }
}

pub fn metrics() -> CurrentMetrics {
  CurrentMetrics {
    total_universities: 3,
    total_researchers: 36,
    total_students: 4500,
    universities_with_tt_hardware: 2,
    researchers_on_tt_hardware: 24,
    students_on_tt_hardware: 3000,
    last_updated: None,
  }
}

impl DashboardApi for FakeApi {
  fn current_metrics(&self) -> ApiFuture<CurrentMetrics> {
    self.record("metrics".to_string());
    async { Ok(metrics()) }.boxed()
  }

  fn timeline(&self, start_date: NaiveDate, end_date: NaiveDate) -> ApiFuture<MetricsTimeline> {
    self.record(format!("timeline:{}:{}", start_date, end_date));
    async move {
      Ok(MetricsTimeline {
        data: Vec::new(),
        start_date,
        end_date,
      })
    }
    .boxed()
  }

  fn growth(&self, period_days: u32) -> ApiFuture<GrowthMetrics> {
    self.record(format!("growth:{}", period_days));
    async move {
      Ok(GrowthMetrics {
        universities_growth: 50.0,
        researchers_growth: 0.0,
        students_growth: -12.5,
        period_days,
        current_universities: 3,
        current_researchers: 36,
        current_students: 4500,
        previous_universities: 2,
        previous_researchers: 36,
        previous_students: 5143,
      })
    }
    .boxed()
  }

  fn hardware_distribution(&self) -> ApiFuture<HardwareDistribution> {
    self.record("hardware".to_string());
    async { Ok([("Wormhole".to_string(), 2)].into_iter().collect()) }.boxed()
  }

  fn universities(&self, query: &RosterQuery) -> ApiFuture<UniversityList> {
    self.record(format!(
      "universities:{}:{}:{}",
      query.search.as_deref().unwrap_or("-"),
      query.sort.as_param(),
      query.has_hardware
    ));
    async {
      Ok(UniversityList {
        universities: vec![university("1", "MIT"), university("2", "Stanford")],
        total: 2,
      })
    }
    .boxed()
  }

  fn university(&self, id: &str) -> ApiFuture<University> {
    self.record(format!("university:{}", id));
    let uni = university(id, "MIT");
    async move { Ok(uni) }.boxed()
  }

  fn university_history(&self, id: &str, limit: u32) -> ApiFuture<Vec<UniversityHistoryEntry>> {
    self.record(format!("history:{}:{}", id, limit));
    async { Ok(Vec::new()) }.boxed()
  }

  fn trigger_sync(&self, create_snapshot: bool) -> ApiFuture<SyncTriggerResponse> {
    self.record(format!("trigger:{}", create_snapshot));
    let gate = self.trigger_gate.lock().unwrap().take();
    let fail = self.fail_trigger.load(Ordering::SeqCst);
    if !fail {
      self.syncing.store(true, Ordering::SeqCst);
    }
    async move {
      if let Some(gate) = gate {
        let _ = gate.await;
      }
      if fail {
        return Err(ApiError::Status {
          status: 409,
          message: "Sync already in progress".to_string(),
        });
      }
      Ok(SyncTriggerResponse {
        sync_id: 7,
        message: "Sync started".to_string(),
        status: "in_progress".to_string(),
      })
    }
    .boxed()
  }

  fn sync_status(&self) -> ApiFuture<SyncStatus> {
    self.record("status".to_string());
    let is_syncing = self.syncing.load(Ordering::SeqCst);
    let fail = self.fail_status.load(Ordering::SeqCst);
    let gate = self.status_gate.lock().unwrap().take();
    async move {
      if let Some(gate) = gate {
        let _ = gate.await;
      }
      if fail {
        return Err(ApiError::Transport("connection refused".to_string()));
      }
      Ok(SyncStatus {
        is_syncing,
        last_sync_at: None,
        last_sync_status: None,
        last_sync_tasks: None,
      })
    }
    .boxed()
  }

  fn sync_history(&self, limit: u32) -> ApiFuture<SyncHistory> {
    self.record(format!("sync_history:{}", limit));
    async { Ok(SyncHistory { history: Vec::new() }) }.boxed()
  }
}
