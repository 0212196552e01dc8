use std::fmt;

/// Identity of a cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
  /// The caller's own todos
  Todos,
  /// All user accounts (admin)
  Users,
}

impl QueryKey {
  pub fn as_str(self) -> &'static str {
    match self {
      QueryKey::Todos => "todos",
      QueryKey::Users => "users",
    }
  }

  /// Human-readable description for logs and titles.
  pub fn description(self) -> &'static str {
    match self {
      QueryKey::Todos => "your todos",
      QueryKey::Users => "all users",
    }
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
