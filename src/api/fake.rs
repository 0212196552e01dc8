//! In-memory gateway used by tests.
//!
//! Mimics the server: checks the bearer credential, enforces the admin
//! capability on admin routes, validates priorities, and counts calls per
//! operation. Failures can be injected per operation.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ApiError, ApiResult};
use crate::session::Credential;

use super::gateway::Gateway;
use super::types::{
  AuthResponse, Authority, LoginRequest, PasswordUpdateRequest, RegisterRequest, Todo,
  TodoRequest, User, ROLE_ADMIN,
};

#[derive(Default)]
struct FakeState {
  accounts: Vec<(User, String)>,
  todos: Vec<Todo>,
  next_todo_id: i64,
  calls: HashMap<&'static str, usize>,
  failures: HashMap<&'static str, VecDeque<ApiError>>,
  latency: Duration,
}

pub struct FakeGateway {
  credential: Credential,
  state: Mutex<FakeState>,
}

pub fn user(id: i64, email: &str, admin: bool) -> User {
  let mut authorities = vec![Authority::new("ROLE_USER")];
  if admin {
    authorities.push(Authority::new(ROLE_ADMIN));
  }
  User {
    id,
    full_name: format!("User {}", id),
    email: email.to_string(),
    authorities,
  }
}

pub fn todo(id: i64, title: &str, complete: bool) -> Todo {
  Todo {
    id,
    title: title.to_string(),
    description: format!("{} description", title),
    priority: 3,
    complete,
  }
}

pub fn token_for(user_id: i64) -> String {
  format!("token-{}", user_id)
}

impl FakeGateway {
  /// A gateway that reads the given credential slot, as the real client does.
  pub fn new(credential: Credential) -> Self {
    Self {
      credential,
      state: Mutex::new(FakeState {
        next_todo_id: 100,
        ..FakeState::default()
      }),
    }
  }

  pub fn with_account(self, user: User, password: &str) -> Self {
    self.lock().accounts.push((user, password.to_string()));
    self
  }

  pub fn with_todos(self, todos: Vec<Todo>) -> Self {
    self.lock().todos = todos;
    self
  }

  pub fn with_latency(self, latency: Duration) -> Self {
    self.lock().latency = latency;
    self
  }

  /// Make the next call to `op` fail with `err`.
  pub fn fail_next(&self, op: &'static str, err: ApiError) {
    self.lock().failures.entry(op).or_default().push_back(err);
  }

  pub fn calls(&self, op: &str) -> usize {
    self.lock().calls.get(op).copied().unwrap_or(0)
  }

  pub fn todos(&self) -> Vec<Todo> {
    self.lock().todos.clone()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Count the call, wait out the latency, then pop any injected failure.
  async fn enter(&self, op: &'static str) -> ApiResult<()> {
    let latency = {
      let mut state = self.lock();
      *state.calls.entry(op).or_default() += 1;
      state.latency
    };
    if !latency.is_zero() {
      tokio::time::sleep(latency).await;
    }
    match self.lock().failures.get_mut(op).and_then(|q| q.pop_front()) {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  fn caller(&self) -> ApiResult<User> {
    let token = self
      .credential
      .get()
      .ok_or_else(|| ApiError::unauthorized("missing token"))?;
    self
      .lock()
      .accounts
      .iter()
      .find(|(u, _)| token_for(u.id) == token)
      .map(|(u, _)| u.clone())
      .ok_or_else(|| ApiError::unauthorized("invalid token"))
  }

  fn admin(&self) -> ApiResult<User> {
    let caller = self.caller()?;
    if caller.is_admin() {
      Ok(caller)
    } else {
      Err(ApiError::forbidden("admin capability required"))
    }
  }
}

#[async_trait]
impl Gateway for FakeGateway {
  async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse> {
    self.enter("login").await?;
    self
      .lock()
      .accounts
      .iter()
      .find(|(u, p)| u.email == request.email && *p == request.password)
      .map(|(u, _)| AuthResponse {
        token: token_for(u.id),
      })
      .ok_or_else(|| ApiError::authentication("Bad credentials"))
  }

  async fn register(&self, request: &RegisterRequest) -> ApiResult<()> {
    self.enter("register").await?;
    let mut state = self.lock();
    if state.accounts.iter().any(|(u, _)| u.email == request.email) {
      return Err(ApiError::validation("email", "email already registered"));
    }
    let id = state.accounts.len() as i64 + 1;
    let mut account = user(id, &request.email, false);
    account.full_name = format!("{} {}", request.first_name, request.last_name);
    state.accounts.push((account, request.password.clone()));
    Ok(())
  }

  async fn current_user(&self) -> ApiResult<User> {
    // The bearer header is fixed when the request is sent
    let caller = self.caller();
    self.enter("current_user").await?;
    caller
  }

  async fn change_password(&self, request: &PasswordUpdateRequest) -> ApiResult<()> {
    self.enter("change_password").await?;
    let caller = self.caller()?;
    let mut state = self.lock();
    let account = state
      .accounts
      .iter_mut()
      .find(|(u, _)| u.id == caller.id)
      .ok_or_else(|| ApiError::not_found("account not found"))?;
    if account.1 != request.old_password {
      return Err(ApiError::validation("oldPassword", "old password is incorrect"));
    }
    account.1 = request.new_password.clone();
    Ok(())
  }

  async fn delete_account(&self) -> ApiResult<()> {
    self.enter("delete_account").await?;
    let caller = self.caller()?;
    self.lock().accounts.retain(|(u, _)| u.id != caller.id);
    Ok(())
  }

  async fn list_todos(&self) -> ApiResult<Vec<Todo>> {
    self.enter("list_todos").await?;
    self.caller()?;
    Ok(self.lock().todos.clone())
  }

  async fn create_todo(&self, request: &TodoRequest) -> ApiResult<Todo> {
    self.enter("create_todo").await?;
    self.caller()?;
    if !(1..=5).contains(&request.priority) {
      return Err(ApiError::validation("priority", "must be between 1 and 5"));
    }
    let mut state = self.lock();
    let item = Todo {
      id: state.next_todo_id,
      title: request.title.clone(),
      description: request.description.clone(),
      priority: request.priority,
      complete: false,
    };
    state.next_todo_id += 1;
    state.todos.push(item.clone());
    Ok(item)
  }

  async fn toggle_todo(&self, id: i64) -> ApiResult<Todo> {
    self.enter("toggle_todo").await?;
    self.caller()?;
    let mut state = self.lock();
    let item = state
      .todos
      .iter_mut()
      .find(|t| t.id == id)
      .ok_or_else(|| ApiError::not_found(format!("todo {} not found", id)))?;
    item.complete = !item.complete;
    Ok(item.clone())
  }

  async fn delete_todo(&self, id: i64) -> ApiResult<()> {
    self.enter("delete_todo").await?;
    self.caller()?;
    let mut state = self.lock();
    let before = state.todos.len();
    state.todos.retain(|t| t.id != id);
    if state.todos.len() == before {
      return Err(ApiError::not_found(format!("todo {} not found", id)));
    }
    Ok(())
  }

  async fn list_users(&self) -> ApiResult<Vec<User>> {
    self.enter("list_users").await?;
    self.admin()?;
    Ok(self.lock().accounts.iter().map(|(u, _)| u.clone()).collect())
  }

  async fn promote_user(&self, id: i64) -> ApiResult<User> {
    self.enter("promote_user").await?;
    self.admin()?;
    let mut state = self.lock();
    let (user, _) = state
      .accounts
      .iter_mut()
      .find(|(u, _)| u.id == id)
      .ok_or_else(|| ApiError::not_found(format!("user {} not found", id)))?;
    if !user.is_admin() {
      user.authorities.push(Authority::new(ROLE_ADMIN));
    }
    Ok(user.clone())
  }

  async fn delete_user(&self, id: i64) -> ApiResult<()> {
    self.enter("delete_user").await?;
    self.admin()?;
    let mut state = self.lock();
    let before = state.accounts.len();
    state.accounts.retain(|(u, _)| u.id != id);
    if state.accounts.len() == before {
      return Err(ApiError::not_found(format!("user {} not found", id)));
    }
    Ok(())
  }
}
