//! Process-wide keyed cache of query results.
//!
//! Every entry is owned here. Callers only go through `subscribe`,
//! `refetch`, `invalidate` and the read-only `peek`.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::QueryKey;
use crate::api::ApiError;

type Value = Arc<dyn Any + Send + Sync>;

/// Lifecycle of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// Never settled
  Pending,
  /// Last settled fetch succeeded
  Success,
  /// Last settled fetch failed (previous data, if any, is kept)
  Error,
}

/// How current the returned data is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
  /// No data has been fetched yet
  Absent,
  /// Data is older than its stale window or was invalidated
  Stale,
  /// Data is within its stale window
  Fresh,
}

/// Best currently-known value for a key plus its status flags.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
  pub data: Option<T>,
  pub status: QueryStatus,
  pub error: Option<ApiError>,
  pub freshness: Freshness,
  /// A fetch for this key is in flight
  pub is_fetching: bool,
  pub fetched_at: Option<Instant>,
}

impl<T> QueryResult<T> {
  fn absent() -> Self {
    Self {
      data: None,
      status: QueryStatus::Pending,
      error: None,
      freshness: Freshness::Absent,
      is_fetching: false,
      fetched_at: None,
    }
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.error.as_ref()
  }

  /// No data yet and a fetch is running.
  pub fn is_loading(&self) -> bool {
    self.data.is_none() && self.is_fetching
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }
}

struct Entry {
  data: Option<Value>,
  /// Time of the last successful fetch
  fetched_at: Option<Instant>,
  /// Time of the last settled fetch, successful or not
  settled_at: Option<Instant>,
  status: QueryStatus,
  error: Option<ApiError>,
  stale_after: Duration,
  invalidated: bool,
  /// Generation current when `invalidated` was last set. A fetch of that
  /// generation or older started before the invalidation and cannot clear it.
  invalidated_at: u64,
  /// Bumped for every fetch started; only the latest may write
  generation: u64,
  /// Bumped on every state change, so pollers can ignore other keys' updates
  revision: u64,
  fetching: bool,
}

impl Entry {
  fn new(stale_after: Duration) -> Self {
    Self {
      data: None,
      fetched_at: None,
      settled_at: None,
      status: QueryStatus::Pending,
      error: None,
      stale_after,
      invalidated: false,
      invalidated_at: 0,
      generation: 0,
      revision: 0,
      fetching: false,
    }
  }

  fn is_stale(&self, now: Instant) -> bool {
    if self.invalidated {
      return true;
    }
    match self.fetched_at {
      Some(at) => now.duration_since(at) > self.stale_after,
      None => true,
    }
  }

  /// Whether a subscriber arriving now should start a fetch.
  fn wants_fetch(&self, now: Instant) -> bool {
    if self.fetching {
      return false;
    }
    match self.status {
      QueryStatus::Pending => true,
      QueryStatus::Success => self.is_stale(now),
      // Failed fetches are only retried on explicit request
      QueryStatus::Error => self.invalidated,
    }
  }

  fn result<T: Clone + 'static>(&self, now: Instant) -> QueryResult<T> {
    let data = self
      .data
      .as_ref()
      .and_then(|v| v.downcast_ref::<T>())
      .cloned();
    let freshness = match (&data, self.is_stale(now)) {
      (None, _) => Freshness::Absent,
      (Some(_), true) => Freshness::Stale,
      (Some(_), false) => Freshness::Fresh,
    };
    QueryResult {
      data,
      status: self.status,
      error: self.error.clone(),
      freshness,
      is_fetching: self.fetching,
      fetched_at: self.fetched_at,
    }
  }
}

/// Next move of an interval poller
pub(super) enum PollStep {
  /// A fetch is in flight; wait for the cache to change
  Wait,
  /// Nothing due before this instant
  Until(Instant),
}

#[derive(Default)]
struct Inner {
  entries: HashMap<QueryKey, Entry>,
}

/// Shared handle to the query cache. Cloning is cheap; all clones see the
/// same entries.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Mutex<Inner>>,
  /// Bumped on every observable change so renderers and pollers can wake
  changes: Arc<watch::Sender<u64>>,
  default_stale_time: Duration,
}

impl QueryCache {
  pub fn new(default_stale_time: Duration) -> Self {
    let (changes, _) = watch::channel(0);
    Self {
      inner: Arc::new(Mutex::new(Inner::default())),
      changes: Arc::new(changes),
      default_stale_time,
    }
  }

  pub fn default_stale_time(&self) -> Duration {
    self.default_stale_time
  }

  /// Receiver that is notified whenever any entry changes.
  pub fn changes(&self) -> watch::Receiver<u64> {
    self.changes.subscribe()
  }

  /// Register interest in `key`.
  ///
  /// Starts `fetcher` if the entry is missing, stale, or invalidated and no
  /// fetch is already in flight. A subscriber arriving during a fetch attaches
  /// to it instead of issuing another call. Returns the best known value.
  pub fn subscribe<T, F, Fut>(&self, key: &QueryKey, stale_after: Duration, fetcher: F) -> QueryResult<T>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let now = Instant::now();
    let (result, started) = {
      let mut inner = self.lock();
      let entry = inner
        .entries
        .entry(key.clone())
        .or_insert_with(|| Entry::new(stale_after));
      entry.stale_after = stale_after;

      let started = entry.wants_fetch(now);
      if started {
        self.start_fetch(key, entry, fetcher);
      }
      (entry.result(now), started)
    };

    if started {
      self.notify();
    }
    result
  }

  /// Force a fetch for `key` regardless of staleness.
  ///
  /// A fetch already in flight is superseded: its response will be discarded
  /// when it arrives. On failure the previous data is kept.
  pub fn refetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryResult<T>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let now = Instant::now();
    let result = {
      let mut inner = self.lock();
      let stale_after = self.default_stale_time;
      let entry = inner
        .entries
        .entry(key.clone())
        .or_insert_with(|| Entry::new(stale_after));
      self.start_fetch(key, entry, fetcher);
      entry.result(now)
    };
    self.notify();
    result
  }

  /// Mark every entry whose key starts with `prefix` as stale.
  ///
  /// Nothing is fetched here; the next active subscriber refetches. Returns
  /// the number of entries matched.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut matched = 0;
    {
      let mut inner = self.lock();
      for (_, entry) in inner.entries.iter_mut().filter(|(key, _)| key.starts_with(prefix)) {
        entry.invalidated = true;
        entry.invalidated_at = entry.generation;
        entry.revision += 1;
        matched += 1;
      }
    }

    debug!(prefix = %prefix, matched, "invalidated queries");
    if matched > 0 {
      self.notify();
    }
    matched
  }

  /// Read the current value without registering interest.
  pub fn peek<T: Clone + 'static>(&self, key: &QueryKey) -> QueryResult<T> {
    let now = Instant::now();
    let inner = self.lock();
    inner
      .entries
      .get(key)
      .map(|entry| entry.result(now))
      .unwrap_or_else(QueryResult::absent)
  }

  /// Subscribe and wait until the entry settles.
  ///
  /// Fresh data is returned without a network call; otherwise this attaches
  /// to the in-flight fetch (or starts one) and waits for it.
  pub async fn fetch_query<T, F, Fut>(
    &self,
    key: &QueryKey,
    stale_after: Duration,
    fetcher: F,
  ) -> Result<T, ApiError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let mut changes = self.changes();
    let mut result = self.subscribe(key, stale_after, fetcher);

    while result.is_fetching {
      if changes.changed().await.is_err() {
        break;
      }
      result = self.peek(key);
    }

    match result {
      QueryResult {
        status: QueryStatus::Error,
        error: Some(err),
        ..
      } => Err(err),
      QueryResult { data: Some(data), .. } => Ok(data),
      _ => Err(ApiError::Decode(format!(
        "no data cached for {} of the requested type",
        key
      ))),
    }
  }

  /// Decide the next move of an interval poller for `key`, starting the fetch
  /// when it is due.
  ///
  /// A fetch is due once `next_interval(latest data)` has elapsed since the
  /// last settle, immediately if the entry was never fetched or has been
  /// invalidated. A failed fetch keeps the previous data, so the cadence stays
  /// the one derived from the last good value.
  ///
  /// Also returns the entry's revision after this step.
  pub(super) fn poll_step<T, F, Fut, I>(
    &self,
    key: &QueryKey,
    stale_after: Duration,
    fetcher: &F,
    next_interval: &I,
  ) -> (PollStep, u64)
  where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    I: Fn(Option<&T>) -> Duration,
  {
    let now = Instant::now();
    let revision;
    {
      let mut inner = self.lock();
      let entry = inner
        .entries
        .entry(key.clone())
        .or_insert_with(|| Entry::new(stale_after));
      if entry.fetching {
        return (PollStep::Wait, entry.revision);
      }

      let due = match entry.settled_at {
        Some(at) if !entry.invalidated => {
          let data = entry.data.as_ref().and_then(|v| v.downcast_ref::<T>());
          at + next_interval(data)
        }
        _ => now,
      };
      if due > now {
        return (PollStep::Until(due), entry.revision);
      }
      self.start_fetch(key, entry, fetcher);
      revision = entry.revision;
    }
    self.notify();
    (PollStep::Wait, revision)
  }

  /// Current revision of `key`, 0 when absent.
  pub(super) fn revision(&self, key: &QueryKey) -> u64 {
    self.lock().entries.get(key).map_or(0, |entry| entry.revision)
  }

  /// Start a fetch for `entry`, bumping its generation. Caller holds the lock.
  fn start_fetch<T, F, Fut>(&self, key: &QueryKey, entry: &mut Entry, fetcher: F)
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    entry.generation += 1;
    entry.revision += 1;
    entry.fetching = true;
    let generation = entry.generation;
    debug!(key = %key, generation, "fetch started");

    let future = fetcher();
    let cache = self.clone();
    let key = key.clone();
    tokio::spawn(async move {
      let result = future.await.map(|data| Arc::new(data) as Value);
      cache.settle(&key, generation, result);
    });
  }

  /// Apply a finished fetch unless a newer one has been started since.
  fn settle(&self, key: &QueryKey, generation: u64, result: Result<Value, ApiError>) {
    {
      let mut inner = self.lock();
      let Some(entry) = inner.entries.get_mut(key) else {
        return;
      };
      if entry.generation != generation {
        debug!(
          key = %key,
          generation,
          current = entry.generation,
          "discarding superseded response"
        );
        return;
      }

      let now = Instant::now();
      entry.revision += 1;
      entry.fetching = false;
      entry.settled_at = Some(now);
      if entry.invalidated_at < generation {
        entry.invalidated = false;
      }
      match result {
        Ok(data) => {
          debug!(key = %key, generation, "fetch succeeded");
          entry.data = Some(data);
          entry.fetched_at = Some(now);
          entry.status = QueryStatus::Success;
          entry.error = None;
        }
        Err(err) => {
          warn!(key = %key, error = %err, "fetch failed");
          entry.status = QueryStatus::Error;
          entry.error = Some(err);
        }
      }
    }
    self.notify();
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn notify(&self) {
    self.changes.send_modify(|version| *version = version.wrapping_add(1));
  }
}

impl std::fmt::Debug for QueryCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryCache")
      .field("entries", &self.lock().entries.len())
      .field("default_stale_time", &self.default_stale_time)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use tokio::sync::oneshot;

  const STALE: Duration = Duration::from_secs(300);

  fn key(name: &str) -> QueryKey {
    QueryKey::new("test").with(name)
  }

  /// Let spawned fetch tasks run to completion.
  async fn settle_tasks() {
    for _ in 0..5 {
      tokio::task::yield_now().await;
    }
  }

  #[tokio::test]
  async fn test_subscribe_fetches_and_caches() {
    let cache = QueryCache::new(STALE);
    let calls = Arc::new(AtomicU32::new(0));

    let fetcher = |calls: Arc<AtomicU32>| {
      move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, ApiError>(vec![1, 2, 3])
      }
    };

    let first: QueryResult<Vec<i32>> = cache.subscribe(&key("a"), STALE, fetcher(calls.clone()));
    assert!(first.is_loading());
    assert_eq!(first.freshness, Freshness::Absent);

    settle_tasks().await;

    let second: QueryResult<Vec<i32>> = cache.subscribe(&key("a"), STALE, fetcher(calls.clone()));
    assert_eq!(second.data(), Some(&vec![1, 2, 3]));
    assert_eq!(second.status, QueryStatus::Success);
    assert_eq!(second.freshness, Freshness::Fresh);
    assert!(!second.is_fetching);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_subscribers_share_one_fetch() {
    let cache = QueryCache::new(STALE);
    let calls = Arc::new(AtomicU32::new(0));
    let (tx, rx) = oneshot::channel::<u32>();
    let mut rx = Some(rx);

    for _ in 0..3 {
      let calls = calls.clone();
      let rx = rx.take();
      let result: QueryResult<u32> = cache.subscribe(&key("dedup"), STALE, move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        match rx {
          Some(rx) => rx.await.map_err(|e| ApiError::Transport(e.to_string())),
          None => Ok(0),
        }
      });
      assert!(result.is_fetching);
    }

    tx.send(7).unwrap();
    settle_tasks().await;

    let result: QueryResult<u32> = cache.peek(&key("dedup"));
    assert_eq!(result.data(), Some(&7));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_distinct_keys_are_independent() {
    let cache = QueryCache::new(STALE);
    let _: QueryResult<&str> = cache.subscribe(&key("one"), STALE, || async { Ok("one") });
    let _: QueryResult<&str> = cache.subscribe(&key("two"), STALE, || async { Ok("two") });
    settle_tasks().await;

    cache.invalidate(&key("one"));
    let _: QueryResult<&str> = cache.refetch(&key("one"), || async {
      Err(ApiError::Transport("down".to_string()))
    });
    settle_tasks().await;

    let one: QueryResult<&str> = cache.peek(&key("one"));
    let two: QueryResult<&str> = cache.peek(&key("two"));
    assert!(one.is_error());
    assert_eq!(two.status, QueryStatus::Success);
    assert_eq!(two.freshness, Freshness::Fresh);
    assert_eq!(two.data(), Some(&"two"));
  }

  #[tokio::test]
  async fn test_superseded_response_is_discarded() {
    let cache = QueryCache::new(STALE);
    let (first_tx, first_rx) = oneshot::channel::<&'static str>();
    let (second_tx, second_rx) = oneshot::channel::<&'static str>();

    let _: QueryResult<&str> = cache.subscribe(&key("race"), STALE, move || async move {
      first_rx.await.map_err(|e| ApiError::Transport(e.to_string()))
    });
    let _: QueryResult<&str> = cache.refetch(&key("race"), move || async move {
      second_rx.await.map_err(|e| ApiError::Transport(e.to_string()))
    });

    second_tx.send("second").unwrap();
    settle_tasks().await;
    first_tx.send("first").unwrap();
    settle_tasks().await;

    let result: QueryResult<&str> = cache.peek(&key("race"));
    assert_eq!(result.data(), Some(&"second"));
    assert!(!result.is_fetching);
  }

  #[tokio::test]
  async fn test_failed_refetch_keeps_previous_data() {
    let cache = QueryCache::new(STALE);
    let _: QueryResult<i32> = cache.subscribe(&key("keep"), STALE, || async { Ok(1) });
    settle_tasks().await;

    let _: QueryResult<i32> = cache.refetch(&key("keep"), || async {
      Err(ApiError::Status {
        status: 500,
        message: "boom".to_string(),
      })
    });
    settle_tasks().await;

    let result: QueryResult<i32> = cache.peek(&key("keep"));
    assert_eq!(result.data(), Some(&1));
    assert!(result.is_error());
    assert_eq!(result.error().map(|e| e.message()), Some("server returned 500: boom".to_string()));
  }

  #[tokio::test]
  async fn test_failed_fetch_is_not_retried_by_subscribe() {
    let cache = QueryCache::new(STALE);
    let calls = Arc::new(AtomicU32::new(0));
    let failing = |calls: Arc<AtomicU32>| {
      move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<i32, _>(ApiError::Transport("refused".to_string()))
      }
    };

    let _ = cache.subscribe(&key("fail"), STALE, failing(calls.clone()));
    settle_tasks().await;
    let result = cache.subscribe(&key("fail"), STALE, failing(calls.clone()));
    assert!(result.is_error());
    assert!(!result.is_loading());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Invalidation makes it eligible again
    cache.invalidate(&key("fail"));
    let _ = cache.subscribe(&key("fail"), STALE, failing(calls.clone()));
    settle_tasks().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_invalidate_without_subscriber_is_lazy() {
    let cache = QueryCache::new(STALE);
    let calls = Arc::new(AtomicU32::new(0));
    let counting = |calls: Arc<AtomicU32>| {
      move || async move { Ok::<_, ApiError>(calls.fetch_add(1, Ordering::SeqCst)) }
    };

    let _ = cache.subscribe(&key("lazy"), STALE, counting(calls.clone()));
    settle_tasks().await;

    assert_eq!(cache.invalidate(&QueryKey::new("test")), 1);
    settle_tasks().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stale: QueryResult<u32> = cache.peek(&key("lazy"));
    assert_eq!(stale.freshness, Freshness::Stale);
    assert_eq!(stale.data(), Some(&0));

    let refreshing = cache.subscribe(&key("lazy"), STALE, counting(calls.clone()));
    assert!(refreshing.is_fetching);
    assert_eq!(refreshing.data(), Some(&0));
    settle_tasks().await;

    let fresh: QueryResult<u32> = cache.peek(&key("lazy"));
    assert_eq!(fresh.data(), Some(&1));
    assert_eq!(fresh.freshness, Freshness::Fresh);
  }

  #[tokio::test]
  async fn test_invalidate_during_fetch_survives_settle() {
    let cache = QueryCache::new(STALE);
    let calls = Arc::new(AtomicU32::new(0));
    let (tx, rx) = oneshot::channel::<u32>();

    let held = calls.clone();
    let _: QueryResult<u32> = cache.subscribe(&key("inflight"), STALE, move || async move {
      held.fetch_add(1, Ordering::SeqCst);
      rx.await.map_err(|e| ApiError::Transport(e.to_string()))
    });
    settle_tasks().await;

    // Invalidated while the first fetch is still out
    assert_eq!(cache.invalidate(&QueryKey::new("test")), 1);
    tx.send(1).unwrap();
    settle_tasks().await;

    let old: QueryResult<u32> = cache.peek(&key("inflight"));
    assert_eq!(old.data(), Some(&1));
    assert_eq!(old.freshness, Freshness::Stale);

    let next = calls.clone();
    let refreshing: QueryResult<u32> = cache.subscribe(&key("inflight"), STALE, move || async move {
      next.fetch_add(1, Ordering::SeqCst);
      Ok(2)
    });
    assert!(refreshing.is_fetching);
    settle_tasks().await;

    let fresh: QueryResult<u32> = cache.peek(&key("inflight"));
    assert_eq!(fresh.data(), Some(&2));
    assert_eq!(fresh.freshness, Freshness::Fresh);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_invalidate_matches_by_prefix() {
    let cache = QueryCache::new(STALE);
    let current = QueryKey::new("metrics").with("current");
    let timeline = QueryKey::new("metrics").with("timeline").with(90u32);
    let status = QueryKey::new("sync").with("status");
    for k in [&current, &timeline, &status] {
      let _: QueryResult<u8> = cache.subscribe(k, STALE, || async { Ok(1) });
    }
    settle_tasks().await;

    assert_eq!(cache.invalidate(&QueryKey::new("metrics")), 2);
    assert_eq!(cache.peek::<u8>(&current).freshness, Freshness::Stale);
    assert_eq!(cache.peek::<u8>(&timeline).freshness, Freshness::Stale);
    assert_eq!(cache.peek::<u8>(&status).freshness, Freshness::Fresh);

    assert_eq!(cache.invalidate(&QueryKey::new("sync")), 1);
    assert_eq!(cache.peek::<u8>(&status).freshness, Freshness::Stale);
  }

  #[tokio::test(start_paused = true)]
  async fn test_entry_goes_stale_after_window() {
    let cache = QueryCache::new(STALE);
    let calls = Arc::new(AtomicU32::new(0));
    let counting = |calls: Arc<AtomicU32>| {
      move || async move { Ok::<_, ApiError>(calls.fetch_add(1, Ordering::SeqCst)) }
    };
    let window = Duration::from_secs(60);

    let _ = cache.subscribe(&key("age"), window, counting(calls.clone()));
    settle_tasks().await;

    tokio::time::advance(Duration::from_secs(59)).await;
    let result = cache.subscribe(&key("age"), window, counting(calls.clone()));
    assert_eq!(result.freshness, Freshness::Fresh);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    let result = cache.subscribe(&key("age"), window, counting(calls.clone()));
    assert_eq!(result.freshness, Freshness::Stale);
    assert!(result.is_fetching);
    settle_tasks().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_fetch_query_waits_for_result() {
    let cache = QueryCache::new(STALE);
    let value: Result<String, ApiError> = cache
      .fetch_query(&key("await"), STALE, || async {
        tokio::task::yield_now().await;
        Ok("done".to_string())
      })
      .await;
    assert_eq!(value.unwrap(), "done");

    let err: Result<String, ApiError> = cache
      .fetch_query(&key("await-err"), STALE, || async {
        Err(ApiError::Decode("bad json".to_string()))
      })
      .await;
    assert_eq!(err.unwrap_err(), ApiError::Decode("bad json".to_string()));
  }

  #[tokio::test]
  async fn test_peek_missing_key() {
    let cache = QueryCache::new(STALE);
    let result: QueryResult<u8> = cache.peek(&key("missing"));
    assert_eq!(result.freshness, Freshness::Absent);
    assert_eq!(result.status, QueryStatus::Pending);
    assert!(!result.is_loading());
  }
}
