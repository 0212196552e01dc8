//! Client-side query cache for server-owned collections.
//!
//! This module provides the synchronization layer between views and the
//! gateway:
//! - Keyed collection snapshots with a stale time
//! - De-duplication of concurrent reads into one network call
//! - Stale-while-revalidate: failed refreshes keep the last good data
//! - Invalidation, with eager refetch for keys that are being displayed
//! - Optimistic writes with exact rollback

mod entry;
mod key;
mod layer;
mod mutation;
mod traits;

pub use entry::{FetchStatus, QuerySnapshot};
pub use key::QueryKey;
pub use layer::{QueryCache, QueryObserver};
pub use mutation::{MutationPhase, OptimisticUpdate};
pub use traits::{map_entity, CacheResult, CacheSource, Cacheable};
