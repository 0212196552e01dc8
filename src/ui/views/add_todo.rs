use crate::api::types::{Todo, TodoRequest};
use crate::error::ApiError;
use crate::query::Mutation;
use crate::store::TaskStore;
use crate::ui::components::{Form, FormEvent, KeyResult, Toasts};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

const DEFAULT_PRIORITY: &str = "1";

pub struct AddTodoView {
  store: TaskStore,
  toasts: Toasts,
  form: Form,
  creating: Option<Mutation<Todo>>,
}

impl AddTodoView {
  pub fn new(store: TaskStore, toasts: Toasts) -> Self {
    let form = Form::new("New todo")
      .field("title", "Title")
      .field("description", "Description")
      .field("priority", "Priority (1 highest - 5)")
      .with_value("priority", DEFAULT_PRIORITY);
    Self {
      store,
      toasts,
      form,
      creating: None,
    }
  }

  fn submit(&mut self) {
    if self.creating.is_some() {
      return;
    }
    let priority = match self.form.value("priority").trim().parse::<u8>() {
      Ok(p) => p,
      Err(_) => {
        self.form.set_error(ApiError::validation(
          "priority",
          "priority must be a number from 1 to 5",
        ));
        return;
      }
    };
    let request = TodoRequest {
      title: self.form.value("title").to_string(),
      description: self.form.value("description").to_string(),
      priority,
    };
    self.form.clear_error();
    let store = self.store.clone();
    self.creating = Some(Mutation::spawn(async move { store.create_todo(request).await }));
  }
}

impl View for AddTodoView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => self.submit(),
      KeyResult::Event(FormEvent::Cancelled) => return ViewAction::Pop,
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 60.min(area.width);
    let height = self.form.height().min(area.height);
    let rect = Rect::new(
      area.x + (area.width - width) / 2,
      area.y + (area.height - height) / 2,
      width,
      height,
    );
    self.form.render(frame, rect, self.creating.is_some());
  }

  fn breadcrumb_label(&self) -> String {
    "New".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    let Some(outcome) = self.creating.as_mut().and_then(Mutation::poll) else {
      return ViewAction::None;
    };
    self.creating = None;
    match outcome {
      Ok(todo) => {
        self.toasts.info(format!("Created \"{}\"", todo.title));
        ViewAction::Pop
      }
      Err(err) => {
        self.toasts.error("Create todo", &err);
        self.form.set_error(err);
        ViewAction::None
      }
    }
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Tab", "next field").with_priority(10),
      ShortcutInfo::new("Enter", "save").with_priority(20),
      ShortcutInfo::new("Esc", "cancel").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::store::testing::{harness, ADA};
  use crossterm::event::{KeyCode, KeyModifiers};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn fill(view: &mut AddTodoView, title: &str, description: &str) {
    for c in title.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    for c in description.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
  }

  async fn settle(view: &mut AddTodoView) -> ViewAction {
    for _ in 0..20 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      let action = view.tick();
      if !matches!(action, ViewAction::None) {
        return action;
      }
    }
    ViewAction::None
  }

  #[tokio::test]
  async fn test_create_with_default_priority_pops() {
    let h = harness(Vec::new());
    h.login(ADA).await;
    let toasts = Toasts::new();
    let mut view = AddTodoView::new(h.store.clone(), toasts.clone());

    fill(&mut view, "Buy milk", "2% fat");
    view.handle_key(key(KeyCode::Enter));

    assert!(matches!(settle(&mut view).await, ViewAction::Pop));
    let created = h.gateway.todos();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].priority, 1);
    assert_eq!(toasts.visible()[0].message, "Created \"Buy milk\"");
  }

  #[tokio::test]
  async fn test_short_title_stays_open_with_error() {
    let h = harness(Vec::new());
    h.login(ADA).await;
    let toasts = Toasts::new();
    let mut view = AddTodoView::new(h.store.clone(), toasts.clone());

    fill(&mut view, "ab", "Semi skimmed");
    view.handle_key(key(KeyCode::Enter));

    assert!(matches!(settle(&mut view).await, ViewAction::None));
    assert!(h.gateway.todos().is_empty());
    assert_eq!(h.gateway.calls("create_todo"), 0);
    assert_eq!(toasts.visible().len(), 1);
  }

  #[tokio::test]
  async fn test_non_numeric_priority_is_rejected_locally() {
    let h = harness(Vec::new());
    h.login(ADA).await;
    let mut view = AddTodoView::new(h.store.clone(), Toasts::new());

    fill(&mut view, "Buy milk", "2% fat");
    view.handle_key(key(KeyCode::Backspace));
    view.handle_key(key(KeyCode::Char('x')));
    view.handle_key(key(KeyCode::Enter));

    assert!(view.creating.is_none());
    assert_eq!(h.gateway.calls("create_todo"), 0);
  }
}
