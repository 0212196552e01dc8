//! Per-key cache entry state.

use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};

use crate::error::{ApiError, ApiResult};

/// Type-erased collection snapshot (`Vec<T>` behind the `Arc`).
pub(super) type AnyData = Arc<dyn Any + Send + Sync>;

/// A fetch shared by every caller reading the same key while it is outstanding.
pub(super) type InFlight = Shared<BoxFuture<'static, ApiResult<AnyData>>>;

/// Factory producing one network read for a key.
pub(super) type ErasedFetcher = Arc<dyn Fn() -> BoxFuture<'static, ApiResult<AnyData>> + Send + Sync>;

/// Network activity of a cache entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchStatus {
  #[default]
  Idle,
  Fetching,
  Error,
}

#[derive(Default)]
pub(super) struct Entry {
  pub data: Option<AnyData>,
  pub status: FetchStatus,
  pub error: Option<ApiError>,
  pub fetched_at: Option<DateTime<Utc>>,
  /// Explicitly marked stale by `invalidate`
  pub invalidated: bool,
  /// Number of `invalidate` calls seen by this entry
  pub invalidations: u64,
  /// Value of `invalidations` when the in-flight fetch started
  pub in_flight_since: u64,
  /// Outstanding fetch and its id; a result is applied only if its id still matches
  pub in_flight: Option<(u64, InFlight)>,
  /// Last fetcher used for this key, kept for eager refetch on invalidation
  pub fetcher: Option<ErasedFetcher>,
  /// Number of live observers (views displaying this key)
  pub observers: usize,
}

impl Entry {
  /// Reset everything except the observer count.
  pub fn purge(&mut self) {
    *self = Entry {
      observers: self.observers,
      ..Entry::default()
    };
  }
}

/// Point-in-time copy of an entry, for rendering.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
  pub data: Option<Arc<Vec<T>>>,
  pub status: FetchStatus,
  pub error: Option<ApiError>,
  pub fetched_at: Option<DateTime<Utc>>,
  pub is_stale: bool,
}

impl<T> Default for QuerySnapshot<T> {
  fn default() -> Self {
    Self {
      data: None,
      status: FetchStatus::Idle,
      error: None,
      fetched_at: None,
      is_stale: true,
    }
  }
}

impl<T> QuerySnapshot<T> {
  pub fn is_fetching(&self) -> bool {
    self.status == FetchStatus::Fetching
  }

  /// First load failed: nothing to show but the error.
  pub fn is_blank_error(&self) -> bool {
    self.data.is_none() && self.status == FetchStatus::Error
  }
}
