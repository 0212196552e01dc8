use crate::api::types::PasswordUpdateRequest;
use crate::query::Mutation;
use crate::store::TaskStore;
use crate::ui::components::{Confirm, Form, FormEvent, KeyResult, Toasts};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

fn password_form() -> Form {
  Form::new("Change password")
    .secret("oldPassword", "Current password")
    .secret("newPassword", "New password")
    .secret("newPassword2", "Confirm new password")
}

/// Account details, password change and account deletion
pub struct SettingsView {
  store: TaskStore,
  toasts: Toasts,
  form: Form,
  confirm: Confirm<()>,
  changing: Option<Mutation<()>>,
  deleting: Option<Mutation<()>>,
}

impl SettingsView {
  pub fn new(store: TaskStore, toasts: Toasts) -> Self {
    Self {
      store,
      toasts,
      form: password_form(),
      confirm: Confirm::new(),
      changing: None,
      deleting: None,
    }
  }

  fn submit(&mut self) {
    if self.changing.is_some() {
      return;
    }
    self.form.clear_error();
    let request = PasswordUpdateRequest {
      old_password: self.form.value("oldPassword").to_string(),
      new_password: self.form.value("newPassword").to_string(),
      new_password2: self.form.value("newPassword2").to_string(),
    };
    let store = self.store.clone();
    self.changing = Some(Mutation::spawn(async move { store.change_password(request).await }));
  }

  fn delete_account(&mut self) {
    let store = self.store.clone();
    self.deleting = Some(Mutation::spawn(async move { store.delete_account().await }));
  }

  fn render_identity(&self, frame: &mut Frame, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let lines = match self.store.session().identity() {
      Some(user) => {
        let role = if user.is_admin() { "admin" } else { "user" };
        vec![
          Line::from(vec![Span::styled("Name   ", label), Span::raw(user.full_name)]),
          Line::from(vec![Span::styled("Email  ", label), Span::raw(user.email)]),
          Line::from(vec![
            Span::styled("Role   ", label),
            Span::styled(role, Style::default().fg(Color::Magenta)),
          ]),
        ]
      }
      None => vec![Line::from(Span::styled("Not signed in", label))],
    };
    let block = Block::default()
      .title(" Account ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    frame.render_widget(Paragraph::new(lines).block(block), area);
  }
}

impl View for SettingsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(()) => {
        self.delete_account();
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    if key.code == KeyCode::Char('d') && key.modifiers.contains(KeyModifiers::CONTROL) {
      if self.deleting.is_none() {
        self
          .confirm
          .ask("Delete your account and all of its todos? This cannot be undone.", ());
      }
      return ViewAction::None;
    }

    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => self.submit(),
      KeyResult::Event(FormEvent::Cancelled) => return ViewAction::Pop,
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 60.min(area.width);
    let x = area.x + (area.width - width) / 2;
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(5), Constraint::Length(self.form.height()), Constraint::Min(0)])
      .split(Rect::new(x, area.y, width, area.height));

    self.render_identity(frame, chunks[0]);
    self.form.render(frame, chunks[1], self.changing.is_some());
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Settings".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(outcome) = self.changing.as_mut().and_then(Mutation::poll) {
      self.changing = None;
      match outcome {
        Ok(()) => {
          self.toasts.info("Password changed");
          self.form.reset();
        }
        Err(err) => {
          self.toasts.error("Change password", &err);
          self.form.set_error(err);
        }
      }
    }

    if let Some(outcome) = self.deleting.as_mut().and_then(Mutation::poll) {
      self.deleting = None;
      match outcome {
        Ok(()) => self.toasts.info("Account deleted"),
        Err(err) => self.toasts.error("Delete account", &err),
      }
    }
    ViewAction::None
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Tab", "next field").with_priority(10),
      ShortcutInfo::new("Enter", "save").with_priority(20),
      ShortcutInfo::new("Ctrl-D", "delete account").with_priority(30),
      ShortcutInfo::new("Esc", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::store::testing::{harness, ADA};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn fill(view: &mut SettingsView, values: [&str; 3]) {
    for value in values {
      for c in value.chars() {
        view.handle_key(key(KeyCode::Char(c)));
      }
      view.handle_key(key(KeyCode::Enter));
    }
  }

  async fn settle(view: &mut SettingsView) {
    for _ in 0..20 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick();
    }
  }

  #[tokio::test]
  async fn test_change_password_resets_form() {
    let h = harness(Vec::new());
    h.login(ADA).await;
    let toasts = Toasts::new();
    let mut view = SettingsView::new(h.store.clone(), toasts.clone());

    fill(&mut view, [ADA.1, "secret9", "secret9"]);
    settle(&mut view).await;

    assert_eq!(h.gateway.calls("change_password"), 1);
    assert_eq!(view.form.value("oldPassword"), "");
    assert_eq!(toasts.visible()[0].message, "Password changed");
  }

  #[tokio::test]
  async fn test_mismatch_keeps_values() {
    let h = harness(Vec::new());
    h.login(ADA).await;
    let mut view = SettingsView::new(h.store.clone(), Toasts::new());

    fill(&mut view, [ADA.1, "secret9", "secret8"]);
    settle(&mut view).await;

    assert_eq!(h.gateway.calls("change_password"), 0);
    assert_eq!(view.form.value("newPassword"), "secret9");
  }

  #[tokio::test]
  async fn test_delete_account_ends_session() {
    let h = harness(Vec::new());
    h.login(ADA).await;
    let mut view = SettingsView::new(h.store.clone(), Toasts::new());

    view.handle_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL));
    view.handle_key(key(KeyCode::Char('y')));
    settle(&mut view).await;

    assert_eq!(h.gateway.calls("delete_account"), 1);
    assert!(!h.store.session().session().is_authenticated());
  }
}
