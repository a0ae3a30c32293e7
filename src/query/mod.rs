//! Query cache and the scheduling primitives built on it.
//!
//! Inspired by TanStack Query: results live in a shared [`QueryCache`] keyed
//! by structural [`QueryKey`]s, with staleness windows, prefix invalidation,
//! request de-duplication and interval polling. Time comes from `tokio::time`
//! so tests can drive it with a paused clock.

mod cache;
mod debounce;
mod key;
mod poll;

pub use cache::{Freshness, QueryCache, QueryResult, QueryStatus};
pub use debounce::Debouncer;
pub use key::QueryKey;
pub use poll::PollHandle;
