//! Sync job coordination: adaptive status polling, the trigger operation and
//! staged invalidation of dependent data once a trigger completes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::keys;
use crate::api::types::{SyncStatus, SyncTriggerResponse};
use crate::api::{ApiError, CachedApi, DashboardApi};
use crate::query::{PollHandle, QueryCache, QueryKey, QueryResult};

/// Status poll interval while a job runs
pub const FAST_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Status poll interval while idle
pub const SLOW_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Gap between refreshing sync status and refreshing the synced data
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
  /// No status poller mounted
  Idle,
  PollingSlow,
  PollingFast,
  /// A trigger call is in flight
  Triggering,
  /// Waiting to invalidate data that depends on the sync
  Settling,
}

impl SyncPhase {
  pub fn label(&self) -> &'static str {
    match self {
      SyncPhase::Idle => "idle",
      SyncPhase::PollingSlow => "idle",
      SyncPhase::PollingFast => "syncing",
      SyncPhase::Triggering => "starting sync",
      SyncPhase::Settling => "refreshing",
    }
  }
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
  pub fast_poll: Duration,
  pub slow_poll: Duration,
  pub settle_delay: Duration,
  /// Trigger one sync (without a snapshot) the first time the coordinator mounts
  pub auto_sync_on_mount: bool,
  /// Run the delayed invalidation even when the trigger call fails
  pub settle_after_failed_trigger: bool,
}

impl Default for SyncSettings {
  fn default() -> Self {
    Self {
      fast_poll: FAST_POLL_INTERVAL,
      slow_poll: SLOW_POLL_INTERVAL,
      settle_delay: SETTLE_DELAY,
      auto_sync_on_mount: true,
      settle_after_failed_trigger: true,
    }
  }
}

impl SyncSettings {
  /// Poll interval following the latest observed status. Unknown status
  /// polls slowly.
  pub fn next_interval(&self, status: Option<&SyncStatus>) -> Duration {
    match status {
      Some(s) if s.is_syncing => self.fast_poll,
      _ => self.slow_poll,
    }
  }
}

/// Invalidations that follow a completed trigger call.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlePlan {
  /// Invalidated as soon as the trigger call returns
  pub immediate: Vec<QueryKey>,
  pub delay: Duration,
  /// Invalidated once `delay` has passed
  pub delayed: Vec<QueryKey>,
}

impl SettlePlan {
  pub fn after_trigger(delay: Duration) -> Self {
    Self {
      immediate: vec![keys::sync_status(), keys::sync_history()],
      delay,
      delayed: vec![keys::metrics(), keys::universities()],
    }
  }
}

#[derive(Default)]
struct Shared {
  triggers_in_flight: AtomicUsize,
  settles_pending: AtomicUsize,
  auto_triggered: AtomicBool,
  last_error: Mutex<Option<ApiError>>,
}

impl Shared {
  fn set_last_error(&self, error: Option<ApiError>) {
    *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = error;
  }
}

/// Counts a trigger as in flight for as long as it lives.
struct InFlight(Arc<Shared>);

impl InFlight {
  fn begin(shared: &Arc<Shared>) -> Self {
    shared.triggers_in_flight.fetch_add(1, Ordering::SeqCst);
    Self(shared.clone())
  }
}

impl Drop for InFlight {
  fn drop(&mut self) {
    self.0.triggers_in_flight.fetch_sub(1, Ordering::SeqCst);
  }
}

/// The part of the coordinator a spawned trigger task needs.
#[derive(Clone)]
struct Core {
  cache: QueryCache,
  api: Arc<dyn DashboardApi>,
  settings: SyncSettings,
  shared: Arc<Shared>,
}

impl Core {
  async fn run(self, guard: InFlight, create_snapshot: bool) -> Result<SyncTriggerResponse, ApiError> {
    info!(create_snapshot, "triggering sync");
    let result = self.api.trigger_sync(create_snapshot).await;
    drop(guard);

    match &result {
      Ok(response) => {
        info!(sync_id = response.sync_id, message = %response.message, "sync accepted");
        self.shared.set_last_error(None);
      }
      Err(err) => {
        warn!(error = %err, "sync trigger failed");
        self.shared.set_last_error(Some(err.clone()));
      }
    }

    self.settle(result.is_ok());
    result
  }

  fn settle(&self, succeeded: bool) {
    let plan = SettlePlan::after_trigger(self.settings.settle_delay);
    for key in &plan.immediate {
      self.cache.invalidate(key);
    }

    if !succeeded && !self.settings.settle_after_failed_trigger {
      return;
    }

    self.shared.settles_pending.fetch_add(1, Ordering::SeqCst);
    let cache = self.cache.clone();
    let shared = self.shared.clone();
    tokio::spawn(async move {
      tokio::time::sleep(plan.delay).await;
      for key in &plan.delayed {
        let n = cache.invalidate(key);
        debug!(prefix = %key, entries = n, "invalidated after sync");
      }
      shared.settles_pending.fetch_sub(1, Ordering::SeqCst);
    });
  }
}

/// Owns the sync status poller and the trigger operation.
///
/// Status is only read through the cache; the remote job is the single
/// source of truth for whether a sync is running.
pub struct SyncCoordinator {
  core: Core,
  poller: Mutex<Option<PollHandle>>,
}

impl SyncCoordinator {
  pub fn new(api: &CachedApi, settings: SyncSettings) -> Self {
    Self {
      core: Core {
        cache: api.cache().clone(),
        api: api.api(),
        settings,
        shared: Arc::new(Shared::default()),
      },
      poller: Mutex::new(None),
    }
  }

  pub fn settings(&self) -> &SyncSettings {
    &self.core.settings
  }

  /// Start polling status. The first mount also fires the automatic sync
  /// when enabled. Mounting twice is a no-op.
  pub fn mount(&self) {
    let mut poller = self.poller();
    if poller.is_some() {
      return;
    }

    let api = self.core.api.clone();
    let settings = self.core.settings.clone();
    *poller = Some(self.core.cache.poll(
      keys::sync_status(),
      Duration::ZERO,
      move || api.sync_status(),
      move |status: Option<&SyncStatus>| settings.next_interval(status),
    ));
    drop(poller);
    info!("sync status polling started");

    if self.core.settings.auto_sync_on_mount
      && !self.core.shared.auto_triggered.swap(true, Ordering::SeqCst)
    {
      // Outcome is reported through `last_error`
      drop(self.trigger(false));
    }
  }

  /// Stop polling. In-flight requests still settle into the cache.
  pub fn unmount(&self) {
    if self.poller().take().is_some() {
      info!("sync status polling stopped");
    }
  }

  pub fn is_mounted(&self) -> bool {
    self.poller().is_some()
  }

  fn poller(&self) -> MutexGuard<'_, Option<PollHandle>> {
    self.poller.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Latest cached status without subscribing.
  pub fn status(&self) -> QueryResult<SyncStatus> {
    self.core.cache.peek(&keys::sync_status())
  }

  /// A job is running remotely, or a trigger call has not returned yet.
  pub fn is_syncing(&self) -> bool {
    self.trigger_in_flight() || self.status().data().is_some_and(|s| s.is_syncing)
  }

  pub fn trigger_in_flight(&self) -> bool {
    self.core.shared.triggers_in_flight.load(Ordering::SeqCst) > 0
  }

  pub fn phase(&self) -> SyncPhase {
    if self.trigger_in_flight() {
      SyncPhase::Triggering
    } else if self.core.shared.settles_pending.load(Ordering::SeqCst) > 0 {
      SyncPhase::Settling
    } else if !self.is_mounted() {
      SyncPhase::Idle
    } else if self.status().data().is_some_and(|s| s.is_syncing) {
      SyncPhase::PollingFast
    } else {
      SyncPhase::PollingSlow
    }
  }

  /// Error from the most recent trigger call, cleared by a successful one.
  pub fn last_error(&self) -> Option<ApiError> {
    self
      .core
      .shared
      .last_error
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Error to show next to the sync controls: the trigger error if any,
  /// else the status poll error.
  pub fn error(&self) -> Option<ApiError> {
    self.last_error().or_else(|| self.status().error)
  }

  /// Fire a trigger on a background task. `is_syncing` is true from the
  /// moment this returns.
  pub fn trigger(&self, create_snapshot: bool) -> JoinHandle<Result<SyncTriggerResponse, ApiError>> {
    let guard = InFlight::begin(&self.core.shared);
    tokio::spawn(self.core.clone().run(guard, create_snapshot))
  }

  /// Trigger and wait for the call to return. The delayed invalidation still
  /// runs in the background.
  pub async fn trigger_and_wait(&self, create_snapshot: bool) -> Result<SyncTriggerResponse, ApiError> {
    let guard = InFlight::begin(&self.core.shared);
    self.core.clone().run(guard, create_snapshot).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::FakeApi;
  use crate::query::Freshness;
  use crate::roster::RosterQuery;
  use std::sync::atomic::Ordering;

  fn setup(settings: SyncSettings) -> (Arc<FakeApi>, CachedApi, SyncCoordinator) {
    let fake = Arc::new(FakeApi::new());
    let api = CachedApi::new(fake.clone(), QueryCache::new(Duration::from_secs(300)));
    let coordinator = SyncCoordinator::new(&api, settings);
    (fake, api, coordinator)
  }

  fn manual() -> SyncSettings {
    SyncSettings {
      auto_sync_on_mount: false,
      ..SyncSettings::default()
    }
  }

  async fn settle() {
    for _ in 0..5 {
      tokio::task::yield_now().await;
    }
  }

  fn freshness<T: Clone + 'static>(api: &CachedApi, key: &QueryKey) -> Freshness {
    api.cache().peek::<T>(key).freshness
  }

  /// Populate status, metrics and roster entries.
  async fn seed(api: &CachedApi) {
    api.load_sync_status().await.unwrap();
    api.load_current_metrics().await.unwrap();
    api.universities(&RosterQuery::default());
    settle().await;
  }

  #[test]
  fn test_next_interval() {
    let settings = SyncSettings::default();
    let mut status = SyncStatus {
      is_syncing: true,
      last_sync_at: None,
      last_sync_status: None,
      last_sync_tasks: None,
    };
    assert_eq!(settings.next_interval(Some(&status)), Duration::from_secs(2));
    status.is_syncing = false;
    assert_eq!(settings.next_interval(Some(&status)), Duration::from_secs(3600));
    assert_eq!(settings.next_interval(None), Duration::from_secs(3600));
  }

  #[test]
  fn test_settle_plan_orders_status_first() {
    let plan = SettlePlan::after_trigger(SETTLE_DELAY);
    assert!(plan.immediate.contains(&keys::sync_status()));
    assert_eq!(plan.delayed, vec![keys::metrics(), keys::universities()]);
    assert_eq!(plan.delay, Duration::from_secs(1));
  }

  #[tokio::test(start_paused = true)]
  async fn test_trigger_invalidates_in_two_phases() {
    let (_fake, api, coordinator) = setup(manual());
    seed(&api).await;

    let metrics = keys::DashboardQuery::CurrentMetrics.key();
    let roster = RosterQuery::default().key();

    coordinator.trigger_and_wait(true).await.unwrap();
    assert_eq!(
      freshness::<SyncStatus>(&api, &keys::sync_status()),
      Freshness::Stale
    );
    assert_eq!(freshness::<crate::api::types::CurrentMetrics>(&api, &metrics), Freshness::Fresh);
    assert_eq!(coordinator.phase(), SyncPhase::Settling);

    tokio::time::sleep(Duration::from_millis(999)).await;
    assert_eq!(freshness::<crate::api::types::CurrentMetrics>(&api, &metrics), Freshness::Fresh);
    assert_eq!(
      freshness::<crate::api::types::UniversityList>(&api, &roster),
      Freshness::Fresh
    );

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(freshness::<crate::api::types::CurrentMetrics>(&api, &metrics), Freshness::Stale);
    assert_eq!(
      freshness::<crate::api::types::UniversityList>(&api, &roster),
      Freshness::Stale
    );
    assert_eq!(coordinator.phase(), SyncPhase::Idle);
  }

  #[tokio::test(start_paused = true)]
  async fn test_syncing_while_trigger_in_flight() {
    let (fake, _api, coordinator) = setup(manual());
    let release = fake.hold_trigger();

    let handle = coordinator.trigger(false);
    assert!(coordinator.is_syncing());
    settle().await;
    assert_eq!(coordinator.phase(), SyncPhase::Triggering);
    assert_eq!(fake.count("trigger:false"), 1);

    release.send(()).unwrap();
    let response = handle.await.unwrap().unwrap();
    assert_eq!(response.sync_id, 7);
    assert!(!coordinator.trigger_in_flight());
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_trigger_still_settles_by_default() {
    let (fake, api, coordinator) = setup(manual());
    seed(&api).await;
    fake.fail_trigger.store(true, Ordering::SeqCst);

    let err = coordinator.trigger_and_wait(false).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 409, .. }));
    assert_eq!(coordinator.last_error(), Some(err));
    assert!(!coordinator.is_syncing());
    assert_eq!(
      freshness::<SyncStatus>(&api, &keys::sync_status()),
      Freshness::Stale
    );

    tokio::time::sleep(Duration::from_millis(1001)).await;
    let metrics = keys::DashboardQuery::CurrentMetrics.key();
    assert_eq!(freshness::<crate::api::types::CurrentMetrics>(&api, &metrics), Freshness::Stale);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_trigger_can_skip_delayed_phase() {
    let (fake, api, coordinator) = setup(SyncSettings {
      settle_after_failed_trigger: false,
      ..manual()
    });
    seed(&api).await;
    fake.fail_trigger.store(true, Ordering::SeqCst);

    assert!(coordinator.trigger_and_wait(false).await.is_err());
    assert_eq!(
      freshness::<SyncStatus>(&api, &keys::sync_status()),
      Freshness::Stale
    );
    assert_eq!(coordinator.phase(), SyncPhase::Idle);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let metrics = keys::DashboardQuery::CurrentMetrics.key();
    assert_eq!(freshness::<crate::api::types::CurrentMetrics>(&api, &metrics), Freshness::Fresh);
  }

  #[tokio::test(start_paused = true)]
  async fn test_success_clears_previous_error() {
    let (fake, _api, coordinator) = setup(manual());
    fake.fail_trigger.store(true, Ordering::SeqCst);
    assert!(coordinator.trigger_and_wait(false).await.is_err());
    assert!(coordinator.error().is_some());

    fake.fail_trigger.store(false, Ordering::SeqCst);
    coordinator.trigger_and_wait(false).await.unwrap();
    assert!(coordinator.last_error().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_poll_cadence_follows_job_state() {
    let (fake, _api, coordinator) = setup(manual());
    fake.syncing.store(true, Ordering::SeqCst);

    coordinator.mount();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fake.count("status"), 1);
    assert_eq!(coordinator.phase(), SyncPhase::PollingFast);

    tokio::time::sleep(FAST_POLL_INTERVAL).await;
    assert_eq!(fake.count("status"), 2);

    fake.syncing.store(false, Ordering::SeqCst);
    tokio::time::sleep(FAST_POLL_INTERVAL).await;
    assert_eq!(fake.count("status"), 3);
    assert_eq!(coordinator.phase(), SyncPhase::PollingSlow);

    tokio::time::sleep(Duration::from_secs(1800)).await;
    assert_eq!(fake.count("status"), 3);

    coordinator.unmount();
    assert_eq!(coordinator.phase(), SyncPhase::Idle);
    tokio::time::sleep(SLOW_POLL_INTERVAL).await;
    assert_eq!(fake.count("status"), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_trigger_switches_poller_to_fast() {
    let (fake, _api, coordinator) = setup(manual());
    coordinator.mount();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(coordinator.phase(), SyncPhase::PollingSlow);

    coordinator.trigger_and_wait(false).await.unwrap();
    settle().await;
    assert_eq!(fake.count("status"), 2);
    assert!(coordinator.status().data().is_some_and(|s| s.is_syncing));

    tokio::time::sleep(Duration::from_millis(1010)).await;
    assert_eq!(coordinator.phase(), SyncPhase::PollingFast);
    tokio::time::sleep(FAST_POLL_INTERVAL).await;
    assert_eq!(fake.count("status"), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_trigger_overtaking_status_read_still_refetches() {
    let (fake, _api, coordinator) = setup(manual());
    let release = fake.hold_status();
    coordinator.mount();
    settle().await;
    assert_eq!(fake.count("status"), 1);

    // Trigger returns while the first read (is_syncing=false) is still out
    coordinator.trigger_and_wait(false).await.unwrap();
    release.send(()).unwrap();
    settle().await;

    assert_eq!(fake.count("status"), 2);
    assert!(coordinator.status().data().is_some_and(|s| s.is_syncing));

    tokio::time::sleep(FAST_POLL_INTERVAL + Duration::from_millis(10)).await;
    assert_eq!(fake.count("status"), 3);
    assert_eq!(coordinator.phase(), SyncPhase::PollingFast);
  }

  #[tokio::test(start_paused = true)]
  async fn test_auto_sync_fires_once() {
    let (fake, _api, coordinator) = setup(SyncSettings::default());
    coordinator.mount();
    settle().await;
    assert_eq!(fake.count("trigger:false"), 1);

    coordinator.mount();
    coordinator.unmount();
    coordinator.mount();
    settle().await;
    assert_eq!(fake.count("trigger"), 1);
  }
}
