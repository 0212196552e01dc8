//! Dashboard filtering and counts over the cached todo list.

use crate::api::types::Todo;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
  #[default]
  All,
  Active,
  Completed,
}

impl StatusFilter {
  pub fn label(self) -> &'static str {
    match self {
      StatusFilter::All => "all",
      StatusFilter::Active => "active",
      StatusFilter::Completed => "completed",
    }
  }

  /// Next filter in the cycle all -> active -> completed -> all.
  pub fn next(self) -> Self {
    match self {
      StatusFilter::All => StatusFilter::Active,
      StatusFilter::Active => StatusFilter::Completed,
      StatusFilter::Completed => StatusFilter::All,
    }
  }

  fn matches(self, todo: &Todo) -> bool {
    match self {
      StatusFilter::All => true,
      StatusFilter::Active => !todo.complete,
      StatusFilter::Completed => todo.complete,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoFilter {
  pub status: StatusFilter,
  /// `None` matches any priority
  pub priority: Option<u8>,
  pub search: String,
}

impl TodoFilter {
  pub fn is_empty(&self) -> bool {
    self.status == StatusFilter::All && self.priority.is_none() && self.search.trim().is_empty()
  }

  /// Cycle the priority filter: any -> 1 -> ... -> 5 -> any.
  pub fn cycle_priority(&mut self) {
    self.priority = match self.priority {
      None => Some(1),
      Some(p) if p >= 5 => None,
      Some(p) => Some(p + 1),
    };
  }

  pub fn matches(&self, todo: &Todo) -> bool {
    if !self.status.matches(todo) {
      return false;
    }
    if self.priority.is_some_and(|p| p != todo.priority) {
      return false;
    }
    let needle = self.search.trim().to_lowercase();
    needle.is_empty()
      || todo.title.to_lowercase().contains(&needle)
      || todo.description.to_lowercase().contains(&needle)
  }

  pub fn apply<'a>(&self, todos: &'a [Todo]) -> Vec<&'a Todo> {
    todos.iter().filter(|t| self.matches(t)).collect()
  }

  /// Short description for the list title, e.g. `active, p2, "milk"`.
  pub fn summary(&self) -> String {
    let mut parts = vec![self.status.label().to_string()];
    if let Some(p) = self.priority {
      parts.push(format!("p{}", p));
    }
    if !self.search.trim().is_empty() {
      parts.push(format!("\"{}\"", self.search.trim()));
    }
    parts.join(", ")
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoStats {
  pub all: usize,
  pub active: usize,
  pub completed: usize,
}

impl TodoStats {
  pub fn of(todos: &[Todo]) -> Self {
    let completed = todos.iter().filter(|t| t.complete).count();
    Self {
      all: todos.len(),
      active: todos.len() - completed,
      completed,
    }
  }
}
