use std::sync::Arc;

use tracing::info;

use crate::api::types::{Todo, TodoRequest};
use crate::cache::{map_entity, CacheResult, QueryKey};
use crate::error::ApiResult;
use crate::validation;

use super::TaskStore;

impl TaskStore {
  /// The caller's todos, cache-first.
  pub async fn todos(&self) -> ApiResult<CacheResult<Arc<Vec<Todo>>>> {
    let gateway = Arc::clone(&self.gateway);
    let result = self
      .cache
      .query(QueryKey::Todos, move || {
        let gateway = Arc::clone(&gateway);
        async move { gateway.list_todos().await }
      })
      .await;
    self.guard(result)
  }

  /// Validate and submit a new todo. The list is refreshed once the server
  /// has assigned an id; nothing is written to the cache beforehand.
  pub async fn create_todo(&self, request: TodoRequest) -> ApiResult<Todo> {
    let request = TodoRequest {
      title: request.title.trim().to_string(),
      description: request.description.trim().to_string(),
      priority: request.priority,
    };
    validation::validate_todo(&request)?;

    let created = self.guard(self.gateway.create_todo(&request).await)?;
    self.cache.invalidate(QueryKey::Todos);
    info!(id = created.id, "todo created");
    Ok(created)
  }

  /// Flip completion optimistically; the cached list changes before the
  /// request is sent and reverts exactly if it fails.
  pub async fn toggle_todo(&self, id: i64) -> ApiResult<Todo> {
    let key = id.to_string();
    let result = self
      .cache
      .mutate_optimistic(
        QueryKey::Todos,
        |items: &[Todo]| map_entity(items, &key, |todo| todo.complete = !todo.complete),
        self.gateway.toggle_todo(id),
      )
      .await;
    let updated = self.guard(result)?;
    info!(id, complete = updated.complete, "todo toggled");
    Ok(updated)
  }

  pub async fn delete_todo(&self, id: i64) -> ApiResult<()> {
    self.guard(self.gateway.delete_todo(id).await)?;
    self.cache.invalidate(QueryKey::Todos);
    info!(id, "todo deleted");
    Ok(())
  }
}
