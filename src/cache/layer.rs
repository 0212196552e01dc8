//! Query cache that orchestrates staleness, de-duplication and invalidation
//! around network fetchers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Utc};
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};

use super::entry::{AnyData, Entry, ErasedFetcher, FetchStatus, InFlight, QuerySnapshot};
use super::key::QueryKey;
use super::traits::{CacheResult, Cacheable};

struct CacheState {
  entries: HashMap<QueryKey, Entry>,
  next_fetch_id: u64,
  /// Bumped by `clear`; a read that spans a clear must not see old data
  clears: u64,
}

/// In-memory cache of server-owned collections.
///
/// The cache is the only writer of its entries. The lock is never held across
/// an await, so every interleaving point sees a consistent entry.
#[derive(Clone)]
pub struct QueryCache {
  state: Arc<Mutex<CacheState>>,
  /// How long before fetched data is considered stale
  stale_time: Duration,
  /// Extra attempts for a failed read
  retry: u32,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryCache {
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(CacheState {
        entries: HashMap::new(),
        next_fetch_id: 1,
        clears: 0,
      })),
      stale_time: Duration::minutes(5),
      retry: 1,
    }
  }

  /// Set the stale time for fetched data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Set how many times a failed read is retried.
  pub fn with_retry(mut self, retry: u32) -> Self {
    self.retry = retry;
    self
  }

  fn lock(&self) -> MutexGuard<'_, CacheState> {
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn is_stale(&self, entry: &Entry) -> bool {
    if entry.invalidated || entry.data.is_none() {
      return true;
    }
    match entry.fetched_at {
      Some(at) => Utc::now() - at >= self.stale_time,
      None => true,
    }
  }

  /// Read a collection with cache-first strategy.
  ///
  /// 1. Fresh entry: returned immediately, no network call
  /// 2. Stale or missing: start a fetch, or join the one already in flight
  /// 3. Success replaces the entry's data
  /// 4. Failure keeps prior data, which is returned flagged `Offline`;
  ///    without prior data (or on `Unauthorized`) the error is surfaced
  pub async fn query<T, F, Fut>(
    &self,
    key: QueryKey,
    fetcher: F,
  ) -> ApiResult<CacheResult<Arc<Vec<T>>>>
  where
    T: Cacheable,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<Vec<T>>> + Send + 'static,
  {
    let erased: ErasedFetcher = Arc::new(move || {
      fetcher()
        .map(|result| result.map(|items| Arc::new(items) as AnyData))
        .boxed()
    });

    let (clears, in_flight) = {
      let mut state = self.lock();
      let entry = state.entries.entry(key).or_default();
      entry.fetcher = Some(Arc::clone(&erased));
      if !self.is_stale(entry) {
        if let Some(data) = &entry.data {
          debug!(%key, "cache hit");
          return Ok(CacheResult::from_cache(
            downcast(key, Arc::clone(data))?,
            entry.fetched_at,
          ));
        }
      }
      (state.clears, self.start_or_join(&mut state, key, erased))
    };

    let result = in_flight.await;
    self.resolve(key, clears, result)
  }

  /// Force a fetch with the last fetcher used for `key`, if any.
  pub async fn refetch(&self, key: QueryKey) -> Option<ApiResult<()>> {
    let in_flight = {
      let mut state = self.lock();
      let fetcher = state.entries.get(&key)?.fetcher.clone()?;
      self.start_or_join(&mut state, key, fetcher)
    };
    Some(in_flight.await.map(|_| ()))
  }

  fn start_or_join(&self, state: &mut CacheState, key: QueryKey, fetcher: ErasedFetcher) -> InFlight {
    let fetch_id = state.next_fetch_id;
    let entry = state.entries.entry(key).or_default();
    if let Some((_, in_flight)) = &entry.in_flight {
      debug!(%key, "joining in-flight fetch");
      return in_flight.clone();
    }

    state.next_fetch_id += 1;
    let task = self.fetch_task(key, fetch_id, fetcher).boxed().shared();
    entry.in_flight = Some((fetch_id, task.clone()));
    entry.in_flight_since = entry.invalidations;
    entry.status = FetchStatus::Fetching;
    debug!(%key, fetch_id, "fetch started");
    task
  }

  fn fetch_task(
    &self,
    key: QueryKey,
    fetch_id: u64,
    fetcher: ErasedFetcher,
  ) -> impl Future<Output = ApiResult<AnyData>> + Send + 'static {
    let cache = self.clone();
    async move {
      let mut attempt = 0;
      let result = loop {
        match fetcher().await {
          Ok(data) => break Ok(data),
          Err(err) if attempt < cache.retry && err.is_retryable() => {
            attempt += 1;
            warn!(%key, attempt, error = %err, "fetch failed, retrying");
          }
          Err(err) => break Err(err),
        }
      };
      if let Some(fetcher) = cache.finish_fetch(key, fetch_id, &result) {
        cache.spawn_refetch(key, fetcher);
      }
      result
    }
  }

  /// Apply a fetch result, unless the fetch was cancelled or purged meanwhile.
  ///
  /// Returns a fetcher to run again when the key was invalidated while this
  /// fetch was outstanding and is still observed.
  fn finish_fetch(
    &self,
    key: QueryKey,
    fetch_id: u64,
    result: &ApiResult<AnyData>,
  ) -> Option<ErasedFetcher> {
    let mut state = self.lock();
    let entry = state.entries.get_mut(&key)?;
    if !matches!(&entry.in_flight, Some((id, _)) if *id == fetch_id) {
      debug!(%key, fetch_id, "discarding superseded fetch result");
      return None;
    }

    entry.in_flight = None;
    let invalidated_meanwhile = entry.invalidations != entry.in_flight_since;
    match result {
      Ok(data) => {
        entry.data = Some(Arc::clone(data));
        entry.status = FetchStatus::Idle;
        entry.error = None;
        entry.fetched_at = Some(Utc::now());
        // The payload may predate the write that invalidated the key
        entry.invalidated = invalidated_meanwhile;
        debug!(%key, fetch_id, invalidated_meanwhile, "fetch applied");
      }
      Err(err) => {
        entry.status = FetchStatus::Error;
        entry.error = Some(err.clone());
        warn!(%key, fetch_id, error = %err, "fetch failed");
        return None;
      }
    }

    if invalidated_meanwhile && entry.observers > 0 {
      entry.fetcher.clone()
    } else {
      None
    }
  }

  fn resolve<T: Cacheable>(
    &self,
    key: QueryKey,
    clears: u64,
    result: ApiResult<AnyData>,
  ) -> ApiResult<CacheResult<Arc<Vec<T>>>> {
    let (current, fetched_at) = {
      let state = self.lock();
      if state.clears != clears {
        debug!(%key, "cache cleared while reading, dropping result");
        return Err(ApiError::server("cache was cleared while loading"));
      }
      state
        .entries
        .get(&key)
        .map(|entry| (entry.data.clone(), entry.fetched_at))
        .unwrap_or((None, None))
    };

    match result {
      // An optimistic write that superseded this fetch wins over the payload
      Ok(fetched) => Ok(CacheResult::from_network(
        downcast(key, current.unwrap_or(fetched))?,
        fetched_at,
      )),
      Err(err) if err.is_unauthorized() => Err(err),
      Err(err) => match current {
        Some(data) => Ok(CacheResult::offline(downcast(key, data)?, fetched_at, err)),
        None => Err(err),
      },
    }
  }

  /// Current state of `key` without touching the network.
  pub fn snapshot<T: Cacheable>(&self, key: QueryKey) -> QuerySnapshot<T> {
    let state = self.lock();
    let Some(entry) = state.entries.get(&key) else {
      return QuerySnapshot::default();
    };
    QuerySnapshot {
      data: entry
        .data
        .clone()
        .and_then(|data| downcast(key, data).ok()),
      status: entry.status,
      error: entry.error.clone(),
      fetched_at: entry.fetched_at,
      is_stale: self.is_stale(entry),
    }
  }

  pub fn get_query_data<T: Cacheable>(&self, key: QueryKey) -> Option<Arc<Vec<T>>> {
    self
      .get_any(key)
      .and_then(|data| downcast(key, data).ok())
  }

  /// Overwrite the cached collection locally.
  pub fn set_query_data<T: Cacheable>(&self, key: QueryKey, items: Vec<T>) {
    self.put_any(key, Some(Arc::new(items)));
  }

  pub(super) fn get_any(&self, key: QueryKey) -> Option<AnyData> {
    self
      .lock()
      .entries
      .get(&key)
      .and_then(|entry| entry.data.clone())
  }

  pub(super) fn put_any(&self, key: QueryKey, data: Option<AnyData>) {
    let mut state = self.lock();
    state.entries.entry(key).or_default().data = data;
  }

  /// Detach any in-flight fetch for `key`; its result will be discarded.
  pub fn cancel(&self, key: QueryKey) {
    let mut state = self.lock();
    if let Some(entry) = state.entries.get_mut(&key) {
      if let Some((fetch_id, _)) = entry.in_flight.take() {
        entry.status = FetchStatus::Idle;
        debug!(%key, fetch_id, "in-flight fetch cancelled");
      }
    }
  }

  /// Mark `key` stale.
  ///
  /// The next `query` refetches. If the entry is being observed and was
  /// fresh, the refetch starts right away. Invalidating an entry that is
  /// already stale changes nothing. A fetch in flight at the time still
  /// lands, but leaves the entry stale and is followed by another read if
  /// the key is observed.
  pub fn invalidate(&self, key: QueryKey) {
    let refetch = {
      let mut state = self.lock();
      let Some(entry) = state.entries.get_mut(&key) else {
        return;
      };
      let already_stale = self.is_stale(entry);
      entry.invalidated = true;
      entry.invalidations += 1;
      debug!(%key, already_stale, observers = entry.observers, "invalidated");

      if already_stale || entry.observers == 0 || entry.in_flight.is_some() {
        None
      } else {
        entry.fetcher.clone()
      }
    };

    if let Some(fetcher) = refetch {
      self.spawn_refetch(key, fetcher);
    }
  }

  fn spawn_refetch(&self, key: QueryKey, fetcher: ErasedFetcher) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
      debug!(%key, "no runtime, refetch deferred to next query");
      return;
    };
    let in_flight = {
      let mut state = self.lock();
      self.start_or_join(&mut state, key, fetcher)
    };
    handle.spawn(async move {
      let _ = in_flight.await;
    });
  }

  /// Drop every entry's data and in-flight work (identity change).
  pub fn clear(&self) {
    let mut state = self.lock();
    state.clears += 1;
    for entry in state.entries.values_mut() {
      entry.purge();
    }
    info!("query cache cleared");
  }

  /// Register interest in `key` until the returned guard is dropped.
  pub fn observe(&self, key: QueryKey) -> QueryObserver {
    let mut state = self.lock();
    state.entries.entry(key).or_default().observers += 1;
    QueryObserver {
      cache: self.clone(),
      key,
    }
  }
}

/// Marks a key as displayed; invalidations of observed keys refetch eagerly.
pub struct QueryObserver {
  cache: QueryCache,
  key: QueryKey,
}

impl Drop for QueryObserver {
  fn drop(&mut self) {
    let mut state = self.cache.lock();
    if let Some(entry) = state.entries.get_mut(&self.key) {
      entry.observers = entry.observers.saturating_sub(1);
    }
  }
}

fn downcast<T: Cacheable>(key: QueryKey, data: AnyData) -> ApiResult<Arc<Vec<T>>> {
  data.downcast::<Vec<T>>().map_err(|_| {
    ApiError::server(format!(
      "cached {} is not a {} collection",
      key,
      T::entity_type()
    ))
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::todo;
  use crate::api::types::Todo;
  use crate::cache::CacheSource;
  use crate::error::ErrorKind;
  use futures::future::BoxFuture;
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicUsize, Ordering};

  type Script = Arc<Mutex<VecDeque<ApiResult<Vec<Todo>>>>>;

  /// Fetcher that counts calls and replays scripted responses, then `fallback`.
  fn scripted(
    calls: Arc<AtomicUsize>,
    script: Script,
    fallback: Vec<Todo>,
    delay_ms: u64,
  ) -> impl Fn() -> BoxFuture<'static, ApiResult<Vec<Todo>>> + Send + Sync + 'static {
    move || {
      calls.fetch_add(1, Ordering::SeqCst);
      let next = script.lock().unwrap().pop_front();
      let fallback = fallback.clone();
      async move {
        if delay_ms > 0 {
          tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }
        next.unwrap_or(Ok(fallback))
      }
      .boxed()
    }
  }

  fn counting(calls: Arc<AtomicUsize>, items: Vec<Todo>) -> impl Fn() -> BoxFuture<'static, ApiResult<Vec<Todo>>> + Send + Sync + 'static {
    scripted(calls, Script::default(), items, 0)
  }

  fn script(responses: Vec<ApiResult<Vec<Todo>>>) -> Script {
    Arc::new(Mutex::new(responses.into()))
  }

  #[tokio::test]
  async fn test_fresh_entry_served_without_fetch() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let first = cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![todo(1, "a", false)]))
      .await
      .unwrap();
    assert_eq!(first.source, CacheSource::Network);

    let second = cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![]))
      .await
      .unwrap();
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert_eq!(second.data.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_queries_share_one_fetch() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let items = vec![todo(1, "a", false), todo(2, "b", true)];

    let (a, b) = tokio::join!(
      cache.query(
        QueryKey::Todos,
        scripted(calls.clone(), Script::default(), items.clone(), 20)
      ),
      cache.query(
        QueryKey::Todos,
        scripted(calls.clone(), Script::default(), items.clone(), 20)
      ),
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&a.data, &b.data));
    assert_eq!(*a.data, items);
  }

  #[tokio::test]
  async fn test_zero_stale_time_always_refetches() {
    let cache = QueryCache::new().with_stale_time(Duration::zero());
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
      cache
        .query(QueryKey::Todos, counting(calls.clone(), vec![]))
        .await
        .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_retry_once_then_surface_error() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let responses = script(vec![
      Err(ApiError::network("connection refused")),
      Err(ApiError::network("connection refused")),
    ]);

    let err = cache
      .query(QueryKey::Todos, scripted(calls.clone(), responses, vec![], 0))
      .await
      .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let snapshot = cache.snapshot::<Todo>(QueryKey::Todos);
    assert!(snapshot.is_blank_error());
  }

  #[tokio::test]
  async fn test_retry_recovers_transient_failure() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let responses = script(vec![Err(ApiError::server("hiccup"))]);

    let result = cache
      .query(
        QueryKey::Todos,
        scripted(calls.clone(), responses, vec![todo(1, "a", false)], 0),
      )
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.data.len(), 1);
  }

  #[tokio::test]
  async fn test_client_errors_are_not_retried() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let responses = script(vec![Err(ApiError::forbidden("admin only"))]);

    let err = cache
      .query(QueryKey::Users, scripted(calls.clone(), responses, vec![], 0))
      .await
      .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_last_good_data() {
    let cache = QueryCache::new().with_retry(0);
    let calls = Arc::new(AtomicUsize::new(0));
    cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![todo(1, "a", false)]))
      .await
      .unwrap();
    cache.invalidate(QueryKey::Todos);

    let responses = script(vec![Err(ApiError::network("offline"))]);
    let result = cache
      .query(QueryKey::Todos, scripted(calls.clone(), responses, vec![], 0))
      .await
      .unwrap();

    assert_eq!(result.source, CacheSource::Offline);
    assert_eq!(result.data.len(), 1);
    assert_eq!(result.error.map(|e| e.kind), Some(ErrorKind::Network));

    let snapshot = cache.snapshot::<Todo>(QueryKey::Todos);
    assert_eq!(snapshot.status, FetchStatus::Error);
    assert_eq!(snapshot.data.map(|d| d.len()), Some(1));
  }

  #[tokio::test]
  async fn test_unauthorized_surfaces_even_with_data() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![todo(1, "a", false)]))
      .await
      .unwrap();
    cache.invalidate(QueryKey::Todos);

    let responses = script(vec![Err(ApiError::unauthorized("expired"))]);
    let err = cache
      .query(QueryKey::Todos, scripted(calls.clone(), responses, vec![], 0))
      .await
      .unwrap_err();
    assert!(err.is_unauthorized());
  }

  #[tokio::test]
  async fn test_invalidate_is_idempotent_until_next_query() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![]))
      .await
      .unwrap();

    cache.invalidate(QueryKey::Todos);
    cache.invalidate(QueryKey::Todos);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.snapshot::<Todo>(QueryKey::Todos).is_stale);

    cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![]))
      .await
      .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!cache.snapshot::<Todo>(QueryKey::Todos).is_stale);
  }

  #[tokio::test]
  async fn test_invalidate_missing_key_is_noop() {
    let cache = QueryCache::new();
    cache.invalidate(QueryKey::Users);
    assert!(cache.get_query_data::<Todo>(QueryKey::Users).is_none());
  }

  #[tokio::test]
  async fn test_invalidate_observed_key_refetches_eagerly() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let _observer = cache.observe(QueryKey::Todos);
    cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![todo(1, "a", false)]))
      .await
      .unwrap();

    cache.invalidate(QueryKey::Todos);
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!cache.snapshot::<Todo>(QueryKey::Todos).is_stale);
  }

  #[tokio::test]
  async fn test_dropped_observer_stops_eager_refetch() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let observer = cache.observe(QueryKey::Todos);
    cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![]))
      .await
      .unwrap();
    drop(observer);

    cache.invalidate(QueryKey::Todos);
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_cancelled_fetch_result_is_discarded() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    cache.set_query_data(QueryKey::Todos, vec![todo(1, "local", true)]);

    let pending = {
      let cache = cache.clone();
      let fetcher = scripted(calls.clone(), Script::default(), vec![todo(1, "server", false)], 30);
      tokio::spawn(async move { cache.query(QueryKey::Todos, fetcher).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert!(cache.snapshot::<Todo>(QueryKey::Todos).is_fetching());

    cache.cancel(QueryKey::Todos);
    let result = pending.await.unwrap().unwrap();

    // The caller sees the cache's current data, not the late payload
    assert_eq!(result.data[0].title, "local");
    let data = cache.get_query_data::<Todo>(QueryKey::Todos).unwrap();
    assert_eq!(data[0].title, "local");
    assert_eq!(cache.snapshot::<Todo>(QueryKey::Todos).status, FetchStatus::Idle);
  }

  #[tokio::test]
  async fn test_clear_purges_data_and_forces_fetch() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![todo(1, "a", false)]))
      .await
      .unwrap();

    cache.clear();
    assert!(cache.get_query_data::<Todo>(QueryKey::Todos).is_none());

    let result = cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![]))
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_invalidate_during_fetch_keeps_entry_stale() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let pending = {
      let cache = cache.clone();
      let fetcher = scripted(calls.clone(), Script::default(), vec![todo(1, "before", false)], 30);
      tokio::spawn(async move { cache.query(QueryKey::Todos, fetcher).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    cache.invalidate(QueryKey::Todos);
    pending.await.unwrap().unwrap();

    // The payload landed but was read before the invalidating write
    let snapshot = cache.snapshot::<Todo>(QueryKey::Todos);
    assert_eq!(snapshot.data.unwrap()[0].title, "before");
    assert!(snapshot.is_stale);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let result = cache
      .query(QueryKey::Todos, counting(calls.clone(), vec![todo(1, "after", true)]))
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(result.data[0].title, "after");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_invalidate_during_observed_fetch_refetches_after() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let _observer = cache.observe(QueryKey::Todos);

    let pending = {
      let cache = cache.clone();
      let fetcher = scripted(calls.clone(), Script::default(), vec![todo(1, "a", false)], 30);
      tokio::spawn(async move { cache.query(QueryKey::Todos, fetcher).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    cache.invalidate(QueryKey::Todos);
    cache.invalidate(QueryKey::Todos);
    pending.await.unwrap().unwrap();

    // One follow-up read for any number of invalidations during the fetch
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!cache.snapshot::<Todo>(QueryKey::Todos).is_stale);
  }

  #[tokio::test]
  async fn test_clear_during_fetch_drops_previous_identity_payload() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let pending = {
      let cache = cache.clone();
      let fetcher = scripted(calls.clone(), Script::default(), vec![todo(1, "theirs", false)], 30);
      tokio::spawn(async move { cache.query(QueryKey::Todos, fetcher).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    cache.clear();

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    let snapshot = cache.snapshot::<Todo>(QueryKey::Todos);
    assert!(snapshot.data.is_none());
    assert_eq!(snapshot.status, FetchStatus::Idle);
  }

  #[tokio::test]
  async fn test_refetch_without_prior_query_is_none() {
    let cache = QueryCache::new();
    assert!(cache.refetch(QueryKey::Todos).await.is_none());
  }
}
