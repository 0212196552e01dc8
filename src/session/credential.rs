use std::sync::{Arc, RwLock};

/// Shared slot holding the current bearer token.
///
/// The gateway reads it on every request; only the session store writes it.
#[derive(Clone, Default)]
pub struct Credential {
  token: Arc<RwLock<Option<String>>>,
}

impl Credential {
  pub fn get(&self) -> Option<String> {
    self
      .token
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  pub fn is_set(&self) -> bool {
    self
      .token
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .is_some()
  }

  pub(super) fn set(&self, token: Option<String>) {
    *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
  }
}

impl std::fmt::Debug for Credential {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    // Never print the token itself
    f.debug_struct("Credential")
      .field("is_set", &self.is_set())
      .finish()
  }
}
