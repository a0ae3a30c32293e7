//! Refetch-on-interval for a single query key.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::cache::{PollStep, QueryCache};
use super::key::QueryKey;
use crate::api::ApiError;

/// Running interval poller. Dropping it stops the timer; a fetch it already
/// issued still lands in the cache.
#[derive(Debug)]
pub struct PollHandle {
  key: QueryKey,
  task: JoinHandle<()>,
}

impl Drop for PollHandle {
  fn drop(&mut self) {
    debug!(key = %self.key, "poller stopped");
    self.task.abort();
  }
}

impl QueryCache {
  /// Keep `key` refreshed, waiting `next_interval(latest data)` after each
  /// settled fetch before issuing the next one.
  ///
  /// The poller counts as an active subscriber: invalidating the key makes it
  /// fetch right away, and a result landing from elsewhere reschedules it.
  pub fn poll<T, F, Fut, I>(
    &self,
    key: QueryKey,
    stale_after: Duration,
    fetcher: F,
    next_interval: I,
  ) -> PollHandle
  where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    I: Fn(Option<&T>) -> Duration + Send + Sync + 'static,
  {
    let cache = self.clone();
    let task_key = key.clone();
    let task = tokio::spawn(async move {
      let mut changes = cache.changes();
      loop {
        let (step, seen) = cache.poll_step(&task_key, stale_after, &fetcher, &next_interval);
        // Sleep through updates to other keys
        loop {
          match step {
            PollStep::Wait => {
              if changes.changed().await.is_err() {
                return;
              }
            }
            PollStep::Until(deadline) => {
              tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                changed = changes.changed() => {
                  if changed.is_err() {
                    return;
                  }
                }
              }
            }
          }
          if cache.revision(&task_key) != seen {
            break;
          }
        }
      }
    });

    debug!(key = %key, "poller started");
    PollHandle { key, task }
  }
}
