//! Quiet-period debouncing with a single pending deadline.

use std::time::Duration;
use tokio::time::Instant;

/// Buffers the latest value and releases it once no new value has arrived
/// for `quiet`. Every push restarts the quiet period.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
  quiet: Duration,
  pending: Option<T>,
  deadline: Option<Instant>,
}

impl<T> Debouncer<T> {
  pub fn new(quiet: Duration) -> Self {
    Self {
      quiet,
      pending: None,
      deadline: None,
    }
  }

  /// Buffer `value`, replacing any earlier one, and restart the timer.
  pub fn push(&mut self, value: T) {
    self.pending = Some(value);
    self.deadline = Some(Instant::now() + self.quiet);
  }

  /// Take the buffered value if its quiet period has elapsed.
  pub fn poll(&mut self) -> Option<T> {
    match self.deadline {
      Some(deadline) if deadline <= Instant::now() => {
        self.deadline = None;
        self.pending.take()
      }
      _ => None,
    }
  }

  /// When the buffered value becomes due, if any.
  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  pub fn is_pending(&self) -> bool {
    self.pending.is_some()
  }

  /// Drop the buffered value and its timer.
  pub fn cancel(&mut self) {
    self.pending = None;
    self.deadline = None;
  }
}
