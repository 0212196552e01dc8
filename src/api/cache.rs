//! Caching implementations for service types.

use crate::cache::Cacheable;

use super::types::{Todo, User};

impl Cacheable for Todo {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "todo"
  }
}

impl Cacheable for User {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "user"
  }
}
