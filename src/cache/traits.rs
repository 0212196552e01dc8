//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};

use crate::error::ApiError;

/// Trait for entities that can live in a cached collection.
pub trait Cacheable: Clone + Send + Sync + 'static {
  /// Unique identifier for this entity within its collection
  fn cache_key(&self) -> String;

  /// Entity type name used in diagnostics (e.g., "todo", "user")
  fn entity_type() -> &'static str;
}

/// Copy of `items` with `f` applied to the entity whose key matches.
///
/// Items with other keys are cloned unchanged; a missing key yields an
/// unchanged copy.
pub fn map_entity<T: Cacheable>(items: &[T], key: &str, f: impl FnOnce(&mut T)) -> Vec<T> {
  let mut out = items.to_vec();
  if let Some(item) = out.iter_mut().find(|item| item.cache_key() == key) {
    f(item);
  }
  out
}

/// Result from a cache read, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was last fetched (if known)
  pub cached_at: Option<DateTime<Utc>>,
  /// The refresh failure, when serving last-good data
  pub error: Option<ApiError>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at,
      error: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at,
      error: None,
    }
  }

  /// Create a result serving last-good data after a failed refresh.
  pub fn offline(data: T, cached_at: Option<DateTime<Utc>>, error: ApiError) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at,
      error: Some(error),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Refresh failed, serving last-good cached data
  Offline,
}
