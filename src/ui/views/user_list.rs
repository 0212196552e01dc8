use crate::api::types::User;
use crate::cache::QueryKey;
use crate::query::Query;
use crate::store::TaskStore;
use crate::ui::components::{Confirm, KeyResult, Toasts};
use crate::ui::ensure_valid_selection;
use crate::ui::pending::PendingWrites;
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// Admin view of every account
pub struct UserListView {
  store: TaskStore,
  query: Query<User>,
  list_state: ListState,
  confirm: Confirm<i64>,
  writes: PendingWrites,
}

impl UserListView {
  pub fn new(store: TaskStore, toasts: Toasts) -> Self {
    let store_for_query = store.clone();
    let mut query = Query::new(store.cache(), QueryKey::Users, move || {
      let store = store_for_query.clone();
      async move { store.users().await }
    });
    query.fetch();

    Self {
      store,
      query,
      list_state: ListState::default(),
      confirm: Confirm::new(),
      writes: PendingWrites::new(toasts),
    }
  }

  fn selected(&self) -> Option<&User> {
    self.query.items().get(self.list_state.selected()?)
  }

  fn promote_selected(&mut self) {
    let Some(user) = self.selected() else {
      return;
    };
    let (id, email) = (user.id, user.email.clone());
    let store = self.store.clone();
    self.writes.start(format!("Promote {}", email), async move {
      let promoted = store.promote_user(id).await?;
      Ok(format!("{} is now an admin", promoted.email))
    });
  }

  fn delete(&mut self, id: i64) {
    let email = self
      .query
      .items()
      .iter()
      .find(|u| u.id == id)
      .map(|u| u.email.clone())
      .unwrap_or_else(|| format!("user {}", id));
    let store = self.store.clone();
    self.writes.start(format!("Delete {}", email), async move {
      store.delete_user(id).await?;
      Ok(format!("Deleted {}", email))
    });
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.query.items().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = if self.query.is_loading() {
      " Users (loading...) ".to_string()
    } else if self.query.is_offline() {
      let reason = self.query.error().map(|e| e.message.as_str()).unwrap_or("refresh failed");
      format!(" Users ({}) (offline: {}) ", len, reason)
    } else {
      format!(" Users ({}) ", len)
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.query.is_blank_error() {
      let message = self
        .query
        .error()
        .map(|e| e.message.clone())
        .unwrap_or_default();
      let paragraph = Paragraph::new(format!("Could not load users: {}", message))
        .block(block)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true });
      frame.render_widget(paragraph, area);
      return;
    }

    let me = self.store.session().identity().map(|u| u.id);
    let items: Vec<ListItem> = self
      .query
      .items()
      .iter()
      .map(|user| {
        let mut spans = vec![
          Span::styled(format!("{:>5} ", user.id), Style::default().fg(Color::DarkGray)),
          Span::styled(
            format!("{:<32}", truncate(&user.email, 32)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!("{:<24}", truncate(&user.full_name, 24))),
        ];
        if user.is_admin() {
          spans.push(Span::styled(" ADMIN", Style::default().fg(Color::Magenta).bold()));
        }
        if me == Some(user.id) {
          spans.push(Span::styled(" (you)", Style::default().fg(Color::DarkGray)));
        }
        ListItem::new(Line::from(spans))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for UserListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(id) => {
        self.delete(id);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('p') => self.promote_selected(),
      KeyCode::Char('d') => {
        if let Some(user) = self.selected() {
          let prompt = format!("Delete {} and all their todos?", user.email);
          let id = user.id;
          self.confirm.ask(prompt, id);
        }
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Users".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    self.writes.poll();
    ViewAction::None
  }

  fn captures_input(&self) -> bool {
    self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("p", "promote").with_priority(20),
      ShortcutInfo::new("d", "delete").with_priority(21),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
