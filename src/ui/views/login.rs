use crate::api::types::{RegisterRequest, User};
use crate::query::Mutation;
use crate::session::SessionStore;
use crate::ui::components::{Form, FormEvent, KeyResult, Toasts};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
  Login,
  Register,
}

fn login_form() -> Form {
  Form::new("Log in")
    .field("email", "Email")
    .secret("password", "Password")
}

fn register_form() -> Form {
  Form::new("Create account")
    .field("firstName", "First name")
    .field("lastName", "Last name")
    .field("email", "Email")
    .secret("password", "Password")
}

/// Sign-in screen shown while there is no session. Ctrl-R switches to
/// account registration.
pub struct LoginView {
  session: SessionStore,
  toasts: Toasts,
  mode: Mode,
  login: Form,
  register: Form,
  signing_in: Option<Mutation<User>>,
  registering: Option<Mutation<()>>,
}

impl LoginView {
  pub fn new(session: SessionStore, toasts: Toasts) -> Self {
    Self {
      session,
      toasts,
      mode: Mode::Login,
      login: login_form(),
      register: register_form(),
      signing_in: None,
      registering: None,
    }
  }

  fn is_busy(&self) -> bool {
    self.signing_in.is_some() || self.registering.is_some()
  }

  fn submit_login(&mut self) {
    self.login.clear_error();
    let session = self.session.clone();
    let email = self.login.value("email").to_string();
    let password = self.login.value("password").to_string();
    self.signing_in = Some(Mutation::spawn(async move {
      session.login(&email, &password).await
    }));
  }

  fn submit_register(&mut self) {
    self.register.clear_error();
    let session = self.session.clone();
    let request = RegisterRequest {
      first_name: self.register.value("firstName").trim().to_string(),
      last_name: self.register.value("lastName").trim().to_string(),
      email: self.register.value("email").trim().to_string(),
      password: self.register.value("password").to_string(),
    };
    self.registering = Some(Mutation::spawn(async move { session.register(&request).await }));
  }

  fn form(&self) -> &Form {
    match self.mode {
      Mode::Login => &self.login,
      Mode::Register => &self.register,
    }
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.mode = match self.mode {
        Mode::Login => Mode::Register,
        Mode::Register => Mode::Login,
      };
      return ViewAction::None;
    }

    let form = match self.mode {
      Mode::Login => &mut self.login,
      Mode::Register => &mut self.register,
    };
    match form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => {
        if self.is_busy() {
          return ViewAction::None;
        }
        match self.mode {
          Mode::Login => self.submit_login(),
          Mode::Register => self.submit_register(),
        }
      }
      KeyResult::Event(FormEvent::Cancelled) => return ViewAction::Pop,
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let form = self.form();
    let width = 50.min(area.width);
    let height = (form.height() + 2).min(area.height);
    let rect = Rect::new(
      area.x + (area.width - width) / 2,
      area.y + (area.height - height) / 2,
      width,
      height,
    );
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(2)])
      .split(rect);

    form.render(frame, rows[0], self.is_busy());

    let hint = match self.mode {
      Mode::Login => "No account? Ctrl-R to register",
      Mode::Register => "Have an account? Ctrl-R to log in",
    };
    frame.render_widget(
      Paragraph::new(hint)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray)),
      rows[1],
    );
  }

  fn breadcrumb_label(&self) -> String {
    match self.mode {
      Mode::Login => "Log in".to_string(),
      Mode::Register => "Register".to_string(),
    }
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(outcome) = self.signing_in.as_mut().and_then(Mutation::poll) {
      self.signing_in = None;
      match outcome {
        Ok(user) => {
          self.toasts.info(format!("Welcome, {}", user.full_name));
          self.login.reset();
        }
        Err(err) => {
          self.toasts.error("Log in", &err);
          self.login.set_error(err);
        }
      }
    }

    if let Some(outcome) = self.registering.as_mut().and_then(Mutation::poll) {
      self.registering = None;
      match outcome {
        Ok(()) => {
          let email = self.register.value("email").trim().to_string();
          self.toasts.info("Account created. Log in to continue");
          self.register.reset();
          self.login = login_form().with_value("email", &email);
          self.login.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
          self.mode = Mode::Login;
        }
        Err(err) => {
          self.toasts.error("Register", &err);
          self.register.set_error(err);
        }
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
      ShortcutInfo::new("Enter", "submit").with_priority(20),
      ShortcutInfo::new("Ctrl-R", "log in/register").with_priority(30),
      ShortcutInfo::new("Esc", "quit").with_priority(90),
    ]
  }
}
