//! Resource operations used by views.
//!
//! `TaskStore` ties the gateway, the query cache and the session together.
//! Reads go through the cache; mutations call the gateway and invalidate
//! exactly the collection they touch. Any `Unauthorized` result ends the
//! session.

mod account;
mod admin;
mod todos;

use std::sync::Arc;

use crate::api::Gateway;
use crate::cache::QueryCache;
use crate::error::ApiResult;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct TaskStore {
  gateway: Arc<dyn Gateway>,
  cache: QueryCache,
  session: SessionStore,
}

impl TaskStore {
  pub fn new(gateway: Arc<dyn Gateway>, cache: QueryCache, session: SessionStore) -> Self {
    Self {
      gateway,
      cache,
      session,
    }
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn session(&self) -> &SessionStore {
    &self.session
  }

  /// Pass `result` through, ending the session first if the credential was rejected.
  fn guard<T>(&self, result: ApiResult<T>) -> ApiResult<T> {
    if let Err(err) = &result {
      if err.is_unauthorized() {
        self.session.expire();
      }
    }
    result
  }
}
