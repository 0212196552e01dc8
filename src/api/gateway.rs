//! The remote resource gateway contract.

use async_trait::async_trait;

use crate::error::ApiResult;

use super::types::{
  AuthResponse, LoginRequest, PasswordUpdateRequest, RegisterRequest, Todo, TodoRequest, User,
};

/// One async function per remote operation.
///
/// Implementations attach the current credential (if any) as a bearer token,
/// classify failures into [`crate::error::ApiError`] and never retry; retry
/// policy belongs to the cache.
#[async_trait]
pub trait Gateway: Send + Sync {
  // Session
  async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse>;
  async fn register(&self, request: &RegisterRequest) -> ApiResult<()>;
  async fn current_user(&self) -> ApiResult<User>;

  // Account
  async fn change_password(&self, request: &PasswordUpdateRequest) -> ApiResult<()>;
  async fn delete_account(&self) -> ApiResult<()>;

  // Todos
  async fn list_todos(&self) -> ApiResult<Vec<Todo>>;
  async fn create_todo(&self, request: &TodoRequest) -> ApiResult<Todo>;
  async fn toggle_todo(&self, id: i64) -> ApiResult<Todo>;
  async fn delete_todo(&self, id: i64) -> ApiResult<()>;

  // Users (admin)
  async fn list_users(&self) -> ApiResult<Vec<User>>;
  async fn promote_user(&self, id: i64) -> ApiResult<User>;
  async fn delete_user(&self, id: i64) -> ApiResult<()>;
}
