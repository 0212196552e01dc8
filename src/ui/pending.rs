use std::future::Future;

use crate::error::{ApiError, ApiResult};
use crate::query::Mutation;

use super::components::Toasts;

/// Writes started by a view. Each outcome is raised as a toast when it lands.
pub struct PendingWrites {
  toasts: Toasts,
  writes: Vec<(String, Mutation<String>)>,
}

impl PendingWrites {
  pub fn new(toasts: Toasts) -> Self {
    Self {
      toasts,
      writes: Vec::new(),
    }
  }

  /// Start `future`; on success it yields the message to show.
  pub fn start<Fut>(&mut self, action: impl Into<String>, future: Fut)
  where
    Fut: Future<Output = ApiResult<String>> + Send + 'static,
  {
    self.writes.push((action.into(), Mutation::spawn(future)));
  }

  pub fn is_busy(&self) -> bool {
    !self.writes.is_empty()
  }

  /// Collect finished writes, toasting each. Returns the failures.
  pub fn poll(&mut self) -> Vec<ApiError> {
    let mut failures = Vec::new();
    let toasts = &self.toasts;
    self.writes.retain_mut(|(action, mutation)| match mutation.poll() {
      None => true,
      Some(Ok(message)) => {
        toasts.info(message);
        false
      }
      Some(Err(err)) => {
        toasts.error(action, &err);
        failures.push(err);
        false
      }
    });
    failures
  }
}
