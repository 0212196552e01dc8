//! Optimistic writes with exact rollback.
//!
//! An update moves `Pending -> (Committed | RolledBack) -> Settled`. Settling
//! always invalidates the key so the next read reconciles with the server.

use std::future::Future;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::ApiResult;

use super::entry::AnyData;
use super::key::QueryKey;
use super::layer::QueryCache;
use super::traits::Cacheable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
  /// Optimistic data applied, request outstanding
  Pending,
  /// Request succeeded; optimistic data stays until reconciled
  Committed,
  /// Request failed; the pre-mutation snapshot was restored
  RolledBack,
  /// Key invalidated; nothing left to do
  Settled,
}

/// A single optimistic write against one cached collection.
///
/// Dropping an update that is still pending rolls it back and settles it.
pub struct OptimisticUpdate<T: Cacheable> {
  cache: QueryCache,
  key: QueryKey,
  /// Exact pre-mutation data, restored on rollback
  previous: Option<AnyData>,
  phase: MutationPhase,
  rolled_back: bool,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Cacheable> OptimisticUpdate<T> {
  pub fn phase(&self) -> MutationPhase {
    self.phase
  }

  pub fn key(&self) -> QueryKey {
    self.key
  }

  /// Request succeeded.
  pub fn commit(&mut self) {
    if self.phase == MutationPhase::Pending {
      self.phase = MutationPhase::Committed;
      debug!(key = %self.key, "optimistic update committed");
    }
  }

  /// Request failed: restore the snapshot taken before the write.
  pub fn rollback(&mut self) {
    if self.phase == MutationPhase::Pending {
      self.cache.put_any(self.key, self.previous.clone());
      self.phase = MutationPhase::RolledBack;
      self.rolled_back = true;
      debug!(key = %self.key, "optimistic update rolled back");
    }
  }

  /// Invalidate the key regardless of outcome. Rolls back first if still pending.
  pub fn settle(&mut self) {
    if self.phase == MutationPhase::Settled {
      return;
    }
    if self.phase == MutationPhase::Pending {
      self.rollback();
    }
    self.cache.invalidate(self.key);
    self.phase = MutationPhase::Settled;
  }

  /// Whether this update ended in a rollback (still known after settling).
  pub fn was_rolled_back(&self) -> bool {
    self.rolled_back
  }
}

impl<T: Cacheable> Drop for OptimisticUpdate<T> {
  fn drop(&mut self) {
    self.settle();
  }
}

impl QueryCache {
  /// Start an optimistic write.
  ///
  /// Cancels any in-flight read of `key`, snapshots the current data, then
  /// stores `apply(current)` synchronously. Without cached data nothing is
  /// written and rollback restores the empty entry.
  pub fn begin_optimistic<T: Cacheable>(
    &self,
    key: QueryKey,
    apply: impl FnOnce(&[T]) -> Vec<T>,
  ) -> OptimisticUpdate<T> {
    self.cancel(key);
    let previous = self.get_any(key);

    if let Some(current) = self.get_query_data::<T>(key) {
      self.set_query_data(key, apply(&current));
    }

    OptimisticUpdate {
      cache: self.clone(),
      key,
      previous,
      phase: MutationPhase::Pending,
      rolled_back: false,
      _marker: PhantomData,
    }
  }

  /// Run `request` as an optimistic mutation of `key`.
  pub async fn mutate_optimistic<T, R, Fut>(
    &self,
    key: QueryKey,
    apply: impl FnOnce(&[T]) -> Vec<T>,
    request: Fut,
  ) -> ApiResult<R>
  where
    T: Cacheable,
    Fut: Future<Output = ApiResult<R>>,
  {
    let mut update = self.begin_optimistic(key, apply);
    let result = request.await;
    match &result {
      Ok(_) => update.commit(),
      Err(_) => update.rollback(),
    }
    update.settle();
    result
  }
}
