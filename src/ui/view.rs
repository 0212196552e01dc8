use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the footer
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request from the App
pub enum ViewAction {
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back); quits from the root view
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, forms, confirmations) and
/// return actions for the App to execute: App → View → Components.
///
/// Views that show server data hold a `Query<T>` and poll it in `tick()`;
/// writes are `Mutation<R>`s collected the same way.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to poll queries and mutations
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// True while the view is taking text input, so `:` and `q` are literal
  fn captures_input(&self) -> bool {
    false
  }

  /// Keyboard shortcuts to display in the footer
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
