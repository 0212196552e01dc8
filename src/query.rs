//! View-side handles over the query cache.
//!
//! A `Query<T>` observes one cache key for as long as the view that owns it
//! is alive. It starts reads on a background task and re-reads the cache
//! snapshot on every tick, so optimistic writes, rollbacks and background
//! refreshes show up without the view doing anything.
//!
//! # Example
//!
//! ```ignore
//! let store = task_store.clone();
//! let mut query = Query::new(store.cache(), QueryKey::Todos, move || {
//!     let store = store.clone();
//!     async move { store.todos().await }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```
//!
//! `Mutation<R>` is the write-side counterpart: a spawned request whose
//! outcome is picked up on a later tick.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::{
  CacheResult, CacheSource, Cacheable, FetchStatus, QueryCache, QueryKey, QueryObserver,
  QuerySnapshot,
};
use crate::error::{ApiError, ApiResult};

type Outcome<T> = ApiResult<CacheResult<Arc<Vec<T>>>>;

/// A boxed future resolving to a cache read
type BoxFuture<T> = Pin<Box<dyn Future<Output = Outcome<T>> + Send>>;

/// A factory function that creates futures for reading the key
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Live view of one cached collection.
pub struct Query<T: Cacheable> {
  cache: QueryCache,
  key: QueryKey,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Outcome<T>>>,
  snapshot: QuerySnapshot<T>,
  source: Option<CacheSource>,
  /// Error from the last read that resolved, including offline reads
  last_error: Option<ApiError>,
  _observer: QueryObserver,
}

impl<T: Cacheable> Query<T> {
  pub fn new<F, Fut>(cache: &QueryCache, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<T>> + Send + 'static,
  {
    Self {
      cache: cache.clone(),
      key,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      snapshot: cache.snapshot(key),
      source: None,
      last_error: None,
      _observer: cache.observe(key),
    }
  }

  pub fn data(&self) -> Option<&Arc<Vec<T>>> {
    self.snapshot.data.as_ref()
  }

  /// Items, or an empty slice before the first successful read.
  pub fn items(&self) -> &[T] {
    self.snapshot.data.as_deref().map(Vec::as_slice).unwrap_or(&[])
  }

  /// A read is outstanding (ours, or a background refresh of the key).
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some() || self.snapshot.is_fetching()
  }

  /// Fetching with nothing to show yet.
  pub fn is_loading(&self) -> bool {
    self.is_fetching() && self.snapshot.data.is_none()
  }

  /// The last read failed and there is no data to show.
  pub fn is_blank_error(&self) -> bool {
    self.snapshot.data.is_none() && self.error().is_some()
  }

  /// Data on screen is the last good copy; the latest refresh failed.
  pub fn is_offline(&self) -> bool {
    self.snapshot.data.is_some()
      && (self.source == Some(CacheSource::Offline) || self.snapshot.status == FetchStatus::Error)
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.snapshot.error.as_ref().or(self.last_error.as_ref())
  }

  pub fn snapshot(&self) -> &QuerySnapshot<T> {
    &self.snapshot
  }

  /// Start a cache read unless one of ours is already outstanding.
  pub fn fetch(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    self.start_fetch();
  }

  /// Mark the key stale and read it again.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.cache.invalidate(self.key);
    self.start_fetch();
  }

  /// Pick up a finished read and re-read the cache snapshot.
  ///
  /// Returns `true` if anything visible changed. Call this in the tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    if let Some(receiver) = &mut self.receiver {
      match receiver.try_recv() {
        Ok(Ok(result)) => {
          debug!(key = %self.key, source = ?result.source, cached_at = ?result.cached_at, "query resolved");
          self.source = Some(result.source);
          self.last_error = result.error;
          self.receiver = None;
          changed = true;
        }
        Ok(Err(err)) => {
          self.source = None;
          self.last_error = Some(err);
          self.receiver = None;
          changed = true;
        }
        Err(mpsc::error::TryRecvError::Empty) => {}
        Err(mpsc::error::TryRecvError::Disconnected) => {
          self.last_error = Some(ApiError::server("query was cancelled"));
          self.receiver = None;
          changed = true;
        }
      }
    }

    let snapshot = self.cache.snapshot::<T>(self.key);
    if differs(&self.snapshot, &snapshot) {
      changed = true;
    }
    self.snapshot = snapshot;

    // The cache was purged underneath us (identity change): load again
    if self.snapshot.data.is_none()
      && self.snapshot.status == FetchStatus::Idle
      && self.receiver.is_none()
      && self.last_error.is_none()
      && self.source.is_some()
    {
      self.source = None;
      self.start_fetch();
      changed = true;
    }

    changed
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

fn differs<T>(a: &QuerySnapshot<T>, b: &QuerySnapshot<T>) -> bool {
  let same_data = match (&a.data, &b.data) {
    (Some(x), Some(y)) => Arc::ptr_eq(x, y),
    (None, None) => true,
    _ => false,
  };
  !same_data || a.status != b.status || a.error != b.error || a.is_stale != b.is_stale
}

impl<T: Cacheable + std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("snapshot", &self.snapshot)
      .field("source", &self.source)
      .finish_non_exhaustive()
  }
}

/// An outstanding write whose outcome is collected on a later tick.
pub struct Mutation<R> {
  receiver: Option<mpsc::UnboundedReceiver<ApiResult<R>>>,
}

impl<R: Send + 'static> Mutation<R> {
  pub fn spawn<Fut>(future: Fut) -> Self
  where
    Fut: Future<Output = ApiResult<R>> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
    Self { receiver: Some(rx) }
  }

  pub fn is_pending(&self) -> bool {
    self.receiver.is_some()
  }

  /// The outcome, exactly once.
  pub fn poll(&mut self) -> Option<ApiResult<R>> {
    let receiver = self.receiver.as_mut()?;
    let outcome = match receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return None,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        Err(ApiError::server("request was cancelled"))
      }
    };
    self.receiver = None;
    Some(outcome)
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::api::fake::todo;
  use crate::api::types::Todo;
  use crate::store::testing::{harness, ADA};
  use crate::store::TaskStore;

  fn todos_query(store: &TaskStore) -> Query<Todo> {
    let store_for_query = store.clone();
    Query::new(store.cache(), QueryKey::Todos, move || {
      let store = store_for_query.clone();
      async move { store.todos().await }
    })
  }

  async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
  }

  #[tokio::test]
  async fn test_query_success() {
    let h = harness(vec![todo(1, "Walk dog", false)]);
    h.login(ADA).await;
    let mut query = todos_query(&h.store);
    assert!(query.data().is_none());

    query.fetch();
    assert!(query.is_loading());
    settle().await;

    assert!(query.poll());
    assert!(!query.is_fetching());
    assert_eq!(query.items(), &[todo(1, "Walk dog", false)]);
  }

  #[tokio::test]
  async fn test_two_queries_share_one_read() {
    let h = harness(vec![todo(1, "Walk dog", false)]);
    h.login(ADA).await;
    let mut a = todos_query(&h.store);
    let mut b = todos_query(&h.store);

    a.fetch();
    b.fetch();
    settle().await;
    a.poll();
    b.poll();

    assert_eq!(h.gateway.calls("list_todos"), 1);
    assert!(Arc::ptr_eq(a.data().unwrap(), b.data().unwrap()));
  }

  #[tokio::test]
  async fn test_first_load_failure_is_blank_error() {
    let h = harness(vec![]);
    h.login(ADA).await;
    h.gateway
      .fail_next("list_todos", ApiError::validation("x", "bad request"));
    let mut query = todos_query(&h.store);

    query.fetch();
    settle().await;
    query.poll();

    assert!(query.is_blank_error());
    assert!(!query.is_offline());
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_data_and_flags_offline() {
    let h = harness(vec![todo(1, "Walk dog", false)]);
    h.login(ADA).await;
    let mut query = todos_query(&h.store);
    query.fetch();
    settle().await;
    query.poll();

    h.gateway
      .fail_next("list_todos", ApiError::network("offline"));
    h.gateway
      .fail_next("list_todos", ApiError::network("offline"));
    query.refetch();
    settle().await;
    query.poll();

    assert!(query.is_offline());
    assert_eq!(query.items().len(), 1);
    assert!(!query.is_blank_error());
  }

  #[tokio::test]
  async fn test_poll_sees_optimistic_write() {
    let h = harness(vec![todo(1, "Walk dog", false)]);
    h.login(ADA).await;
    let mut query = todos_query(&h.store);
    query.fetch();
    settle().await;
    query.poll();

    let _update = h
      .store
      .cache()
      .begin_optimistic::<Todo>(QueryKey::Todos, |items| {
        crate::cache::map_entity(items, "1", |t| t.complete = true)
      });

    assert!(query.poll());
    assert!(query.items()[0].complete);
  }

  #[tokio::test]
  async fn test_mutation_reports_once() {
    let mut mutation = Mutation::spawn(async { Ok::<_, ApiError>(7) });
    assert!(mutation.is_pending());
    settle().await;

    assert_eq!(mutation.poll(), Some(Ok(7)));
    assert!(!mutation.is_pending());
    assert_eq!(mutation.poll(), None);
  }
}
