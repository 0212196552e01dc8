//! Authenticated session state.
//!
//! The session store is the only writer of the credential slot and the
//! persisted token. It coordinates with the query cache by calling it
//! directly: every identity change purges identity-scoped collections.

mod credential;
mod storage;

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::api::types::{LoginRequest, RegisterRequest, User, ROLE_ADMIN};
use crate::api::Gateway;
use crate::cache::QueryCache;
use crate::error::{ApiError, ApiResult};
use crate::validation;

pub use credential::Credential;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, TOKEN_KEY};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
  #[default]
  Uninitialized,
  Resolving,
  Ready,
}

/// Snapshot of the session for display and routing.
#[derive(Clone, Default)]
pub struct Session {
  pub token: Option<String>,
  pub identity: Option<User>,
  pub status: SessionStatus,
}

impl Session {
  pub fn is_authenticated(&self) -> bool {
    self.token.is_some() && self.identity.is_some()
  }
}

#[derive(Default)]
struct SessionState {
  identity: Option<User>,
  status: SessionStatus,
  /// Bumped on every credential change; late identity results from an older
  /// epoch are dropped
  epoch: u64,
}

struct Inner {
  gateway: Arc<dyn Gateway>,
  storage: Arc<dyn KeyValueStore>,
  credential: Credential,
  cache: QueryCache,
  state: Mutex<SessionState>,
}

/// Handle to the process-wide session. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
  inner: Arc<Inner>,
}

impl SessionStore {
  pub fn new(
    gateway: Arc<dyn Gateway>,
    storage: Arc<dyn KeyValueStore>,
    credential: Credential,
    cache: QueryCache,
  ) -> Self {
    Self {
      inner: Arc::new(Inner {
        gateway,
        storage,
        credential,
        cache,
        state: Mutex::new(SessionState::default()),
      }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, SessionState> {
    self
      .inner
      .state
      .lock()
      .unwrap_or_else(|e| e.into_inner())
  }

  /// Restore the session from the persisted token, if any.
  ///
  /// A token the server no longer accepts is removed from storage; the
  /// session ends `Ready` either way.
  pub async fn initialize(&self) -> Option<User> {
    let stored = match self.inner.storage.get(TOKEN_KEY) {
      Ok(token) => token,
      Err(err) => {
        warn!(error = %err, "failed to read stored token");
        None
      }
    };

    let Some(token) = stored else {
      self.lock().status = SessionStatus::Ready;
      info!("no stored session");
      return None;
    };

    let epoch = {
      let mut state = self.lock();
      state.epoch += 1;
      state.status = SessionStatus::Resolving;
      self.inner.credential.set(Some(token));
      state.epoch
    };

    let result = self.inner.gateway.current_user().await;

    let mut state = self.lock();
    if state.epoch != epoch {
      return state.identity.clone();
    }
    state.status = SessionStatus::Ready;
    match result {
      Ok(user) => {
        info!(email = %user.email, "session restored");
        state.identity = Some(user.clone());
        drop(state);
        self.inner.cache.clear();
        Some(user)
      }
      Err(err) => {
        warn!(error = %err, "stored session rejected");
        state.identity = None;
        state.epoch += 1;
        self.inner.credential.set(None);
        drop(state);
        self.remove_persisted();
        None
      }
    }
  }

  /// Exchange credentials for a token, then resolve the identity.
  ///
  /// On any failure the store is left exactly as it was.
  pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
    let request = LoginRequest {
      email: email.trim().to_string(),
      password: password.to_string(),
    };
    validation::validate_login(&request)?;

    let response = self.inner.gateway.login(&request).await?;

    let (epoch, previous_token, previous_status) = {
      let mut state = self.lock();
      let previous_token = self.inner.credential.get();
      let previous_status = state.status;
      state.epoch += 1;
      state.status = SessionStatus::Resolving;
      self.inner.credential.set(Some(response.token.clone()));
      (state.epoch, previous_token, previous_status)
    };

    let result = self.inner.gateway.current_user().await;

    let mut state = self.lock();
    match result {
      Ok(_) if state.epoch != epoch => {
        warn!("session reset while logging in, discarding token");
        Err(ApiError::authentication("signed out while logging in"))
      }
      Ok(user) => {
        state.identity = Some(user.clone());
        state.status = SessionStatus::Ready;
        drop(state);
        if let Err(err) = self.inner.storage.set(TOKEN_KEY, &response.token) {
          warn!(error = %err, "failed to persist token");
        }
        self.inner.cache.clear();
        info!(email = %user.email, "logged in");
        Ok(user)
      }
      Err(err) => {
        if state.epoch == epoch {
          state.epoch += 1;
          state.status = previous_status;
          self.inner.credential.set(previous_token);
        }
        warn!(error = %err, "identity lookup after login failed");
        Err(err)
      }
    }
  }

  /// Create an account. Never establishes a session.
  pub async fn register(&self, request: &RegisterRequest) -> ApiResult<()> {
    validation::validate_register(request)?;
    self.inner.gateway.register(request).await?;
    info!(email = %request.email, "account registered");
    Ok(())
  }

  /// Clear credential and identity, and purge every cached collection.
  pub fn logout(&self) {
    self.reset();
    info!("logged out");
  }

  /// The server rejected the credential: same effect as logout.
  pub fn expire(&self) {
    if self.inner.credential.is_set() {
      warn!("credential rejected, clearing session");
      self.reset();
    }
  }

  fn reset(&self) {
    {
      let mut state = self.lock();
      state.epoch += 1;
      state.identity = None;
      state.status = SessionStatus::Ready;
      self.inner.credential.set(None);
    }
    self.remove_persisted();
    self.inner.cache.clear();
  }

  fn remove_persisted(&self) {
    if let Err(err) = self.inner.storage.remove(TOKEN_KEY) {
      warn!(error = %err, "failed to remove stored token");
    }
  }

  pub fn session(&self) -> Session {
    let state = self.lock();
    Session {
      token: self.inner.credential.get(),
      identity: state.identity.clone(),
      status: state.status,
    }
  }

  pub fn identity(&self) -> Option<User> {
    self.lock().identity.clone()
  }

  pub fn has_capability(&self, name: &str) -> bool {
    self
      .lock()
      .identity
      .as_ref()
      .is_some_and(|user| user.has_authority(name))
  }

  pub fn is_admin(&self) -> bool {
    self.has_capability(ROLE_ADMIN)
  }
}
