use std::sync::Arc;

use tracing::info;

use crate::api::types::User;
use crate::cache::{CacheResult, QueryKey};
use crate::error::ApiResult;

use super::TaskStore;

impl TaskStore {
  /// All accounts. The server rejects callers without the admin capability.
  pub async fn users(&self) -> ApiResult<CacheResult<Arc<Vec<User>>>> {
    let gateway = Arc::clone(&self.gateway);
    let result = self
      .cache
      .query(QueryKey::Users, move || {
        let gateway = Arc::clone(&gateway);
        async move { gateway.list_users().await }
      })
      .await;
    self.guard(result)
  }

  pub async fn promote_user(&self, id: i64) -> ApiResult<User> {
    let promoted = self.guard(self.gateway.promote_user(id).await)?;
    self.cache.invalidate(QueryKey::Users);
    info!(id, "user promoted");
    Ok(promoted)
  }

  pub async fn delete_user(&self, id: i64) -> ApiResult<()> {
    self.guard(self.gateway.delete_user(id).await)?;
    self.cache.invalidate(QueryKey::Users);
    info!(id, "user deleted");
    Ok(())
  }
}
