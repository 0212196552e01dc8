use crate::api::types::User;
use crate::config::Config;
use crate::error::ApiError;
use crate::event::{Event, EventHandler};
use crate::query::Mutation;
use crate::session::SessionStatus;
use crate::store::TaskStore;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Toasts};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{LoginView, SettingsView, TodoListView, UserListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
  config: Config,
  store: TaskStore,
  toasts: Toasts,

  /// Navigation stack - root is always at index 0, empty while starting up
  views: Vec<Box<dyn View>>,

  /// Command palette (after pressing :)
  command: CommandInput,

  /// Restoring the persisted session
  startup: Option<Mutation<Option<User>>>,

  /// Session state the current view stack was built for
  authenticated: bool,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config, store: TaskStore) -> Self {
    Self {
      config,
      store,
      toasts: Toasts::new(),
      views: Vec::new(),
      command: CommandInput::new(),
      startup: None,
      authenticated: false,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let result = self.event_loop().await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(TICK_RATE);

    let session = self.store.session().clone();
    self.startup = Some(Mutation::spawn(async move { Ok(session.initialize().await) }));

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }
    Ok(())
  }

  fn tick(&mut self) {
    if let Some(outcome) = self.startup.as_mut().and_then(Mutation::poll) {
      self.startup = None;
      let restored = outcome.ok().flatten();
      info!(restored = restored.is_some(), "startup complete");
      self.authenticated = restored.is_some();
      self.reset_root();
    }
    if self.startup.is_some() {
      return;
    }

    self.sync_session();

    if let Some(view) = self.views.last_mut() {
      let action = view.tick();
      self.apply(action);
    }
    self.toasts.expire();
  }

  /// Rebuild the view stack when the session appears or goes away behind
  /// our back (login, expiry, account deletion).
  fn sync_session(&mut self) {
    let authenticated = self.store.session().session().is_authenticated();
    self.command.set_admin(self.store.session().is_admin());
    if authenticated == self.authenticated {
      return;
    }
    debug!(authenticated, "session changed");
    self.authenticated = authenticated;
    if !authenticated {
      self.toasts.info("You have been signed out");
    }
    self.reset_root();
  }

  fn reset_root(&mut self) {
    let root: Box<dyn View> = if self.authenticated {
      Box::new(TodoListView::new(self.store.clone(), self.toasts.clone()))
    } else {
      Box::new(LoginView::new(self.store.session().clone(), self.toasts.clone()))
    };
    self.views = vec![root];
    self.command.set_admin(self.store.session().is_admin());
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.views.push(view),
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }
    if self.startup.is_some() {
      return;
    }

    let palette_open = self.command.is_active();
    let view_typing = self.views.last().is_some_and(|v| v.captures_input());
    if palette_open || (self.authenticated && !view_typing) {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    if let Some(view) = self.views.last_mut() {
      let action = view.handle_key(key);
      self.apply(action);
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    debug!(cmd, "command");
    match cmd {
      "todos" => {
        self.views = vec![Box::new(TodoListView::new(self.store.clone(), self.toasts.clone()))];
      }
      "users" => {
        if self.store.session().is_admin() {
          self.views = vec![Box::new(UserListView::new(self.store.clone(), self.toasts.clone()))];
        } else {
          self.toasts.error(
            "Open users",
            &ApiError::forbidden("admin capability required"),
          );
        }
      }
      "settings" => {
        self
          .views
          .push(Box::new(SettingsView::new(self.store.clone(), self.toasts.clone())));
      }
      "logout" => {
        self.store.session().logout();
        self.authenticated = false;
        self.reset_root();
        self.toasts.info("Logged out");
      }
      "quit" => self.should_quit = true,
      "" => {}
      other => self.toasts.info(format!("Unknown command: {}", other)),
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let session = self.store.session().session();
    draw_header(frame, chunks[0], &self.config.server.url, session.identity.as_ref());

    match self.views.last_mut() {
      Some(view) => view.render(frame, chunks[1]),
      None => {
        let message = match session.status {
          SessionStatus::Resolving => "Restoring session...",
          _ => "Starting...",
        };
        let splash = Paragraph::new(message)
          .alignment(Alignment::Center)
          .style(Style::default().fg(Color::DarkGray));
        let area = Rect::new(chunks[1].x, chunks[1].y + chunks[1].height / 2, chunks[1].width, 1);
        frame.render_widget(splash, area);
      }
    }

    let breadcrumb: Vec<String> = self.views.iter().map(|v| v.breadcrumb_label()).collect();
    let mut shortcuts = self.views.last().map(|v| v.shortcuts()).unwrap_or_default();
    if !self.authenticated {
      shortcuts.retain(|s| s.key != ":");
    }
    draw_footer(frame, chunks[2], &breadcrumb, &shortcuts);

    self.toasts.render(frame, chunks[1]);
    self.command.render_overlay(frame, chunks[1]);
  }
}
