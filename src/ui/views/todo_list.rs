use crate::api::types::Todo;
use crate::cache::QueryKey;
use crate::filter::{TodoFilter, TodoStats};
use crate::query::Query;
use crate::store::TaskStore;
use crate::ui::components::{Confirm, KeyResult, SearchEvent, SearchInput, Toasts};
use crate::ui::ensure_valid_selection;
use crate::ui::pending::PendingWrites;
use crate::ui::renderfns::{priority_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::AddTodoView;
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// Dashboard: the caller's todos with filters, toggling and deletion
pub struct TodoListView {
  store: TaskStore,
  toasts: Toasts,
  query: Query<Todo>,
  filter: TodoFilter,
  search: SearchInput,
  list_state: ListState,
  confirm: Confirm<i64>,
  writes: PendingWrites,
}

impl TodoListView {
  pub fn new(store: TaskStore, toasts: Toasts) -> Self {
    let store_for_query = store.clone();
    let mut query = Query::new(store.cache(), QueryKey::Todos, move || {
      let store = store_for_query.clone();
      async move { store.todos().await }
    });
    query.fetch();

    Self {
      store,
      writes: PendingWrites::new(toasts.clone()),
      toasts,
      query,
      filter: TodoFilter::default(),
      search: SearchInput::new(),
      list_state: ListState::default(),
      confirm: Confirm::new(),
    }
  }

  fn visible(&self) -> Vec<&Todo> {
    self.filter.apply(self.query.items())
  }

  fn selected(&self) -> Option<Todo> {
    let index = self.list_state.selected()?;
    self.visible().get(index).map(|t| (*t).clone())
  }

  fn toggle_selected(&mut self) {
    let Some(todo) = self.selected() else {
      return;
    };
    let store = self.store.clone();
    self.writes.start(format!("Update \"{}\"", todo.title), async move {
      let updated = store.toggle_todo(todo.id).await?;
      Ok(if updated.complete {
        format!("Completed \"{}\"", updated.title)
      } else {
        format!("Reopened \"{}\"", updated.title)
      })
    });
  }

  fn delete(&mut self, id: i64) {
    let title = self
      .query
      .items()
      .iter()
      .find(|t| t.id == id)
      .map(|t| t.title.clone())
      .unwrap_or_default();
    let store = self.store.clone();
    self.writes.start(format!("Delete \"{}\"", title), async move {
      store.delete_todo(id).await?;
      Ok(format!("Deleted \"{}\"", title))
    });
  }

  fn clear_filters(&mut self) {
    self.filter = TodoFilter::default();
    self.search.clear();
  }

  fn render_stats(&self, frame: &mut Frame, area: Rect) {
    let stats = TodoStats::of(self.query.items());
    let mut spans = vec![
      Span::styled(" all ", Style::default().fg(Color::DarkGray)),
      Span::styled(stats.all.to_string(), Style::default().fg(Color::White).bold()),
      Span::styled("  active ", Style::default().fg(Color::DarkGray)),
      Span::styled(stats.active.to_string(), Style::default().fg(Color::Yellow).bold()),
      Span::styled("  completed ", Style::default().fg(Color::DarkGray)),
      Span::styled(stats.completed.to_string(), Style::default().fg(Color::Green).bold()),
    ];
    if let Some(at) = self.query.snapshot().fetched_at {
      spans.push(Span::styled(
        format!("  updated {}", at.with_timezone(&Local).format("%H:%M:%S")),
        Style::default().fg(Color::DarkGray),
      ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let total = self.query.items().len();
    let len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = if self.query.is_loading() {
      " Todos (loading...) ".to_string()
    } else if self.query.is_offline() {
      let reason = self.query.error().map(|e| e.message.as_str()).unwrap_or("refresh failed");
      format!(" Todos [{}] ({} of {}) (offline: {}) ", self.filter.summary(), len, total, reason)
    } else {
      format!(" Todos [{}] ({} of {}) ", self.filter.summary(), len, total)
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
      let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
          format!("Could not load todos: {}", message),
          Style::default().fg(Color::Red),
        )),
        Line::from(Span::styled(
          "Press r to retry.",
          Style::default().fg(Color::DarkGray),
        )),
      ])
      .block(block)
      .wrap(Wrap { trim: true });
      frame.render_widget(paragraph, area);
      return;
    }

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.data().is_none() {
        "Nothing loaded yet. Press r to load."
      } else if total == 0 {
        "No todos yet. Press a to add one."
      } else {
        "No todos match the filter. Press c to clear it."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let width = area.width.saturating_sub(16) as usize;
    let items: Vec<ListItem> = self
      .visible()
      .iter()
      .map(|todo| {
        let (mark, mark_color) = if todo.complete {
          ("[x]", Color::Green)
        } else {
          ("[ ]", Color::White)
        };
        let title_style = if todo.complete {
          Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
        } else {
          Style::default()
        };

        let mut spans = vec![
          Span::styled(mark, Style::default().fg(mark_color)),
          Span::raw(" "),
          Span::styled(
            format!("P{}", todo.priority),
            Style::default().fg(priority_color(todo.priority)).bold(),
          ),
          Span::raw(" "),
          Span::styled(truncate(&todo.title, width), title_style),
        ];
        if !todo.description.is_empty() {
          let room = width.saturating_sub(todo.title.chars().count() + 3);
          if room > 3 {
            spans.push(Span::styled(
              format!("  {}", truncate(&todo.description, room)),
              Style::default().fg(Color::DarkGray),
            ));
          }
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

impl View for TodoListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(id) => {
        self.delete(id);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(text)) => {
        self.filter.search = text;
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
      KeyCode::Char('a') => {
        return ViewAction::Push(Box::new(AddTodoView::new(
          self.store.clone(),
          self.toasts.clone(),
        )));
      }
      KeyCode::Char('d') => {
        if let Some(todo) = self.selected() {
          self
            .confirm
            .ask(format!("Delete \"{}\"?", truncate(&todo.title, 40)), todo.id);
        }
      }
      KeyCode::Char('f') => self.filter.status = self.filter.status.next(),
      KeyCode::Char('p') => self.filter.cycle_priority(),
      KeyCode::Char('c') => self.clear_filters(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(1)])
      .split(area);

    self.render_stats(frame, chunks[0]);
    self.render_list(frame, chunks[1]);
    self.search.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Todos".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    self.writes.poll();
    ViewAction::None
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("a", "add").with_priority(20),
      ShortcutInfo::new("space", "toggle").with_priority(21),
      ShortcutInfo::new("d", "delete").with_priority(22),
      ShortcutInfo::new("f", "status").with_priority(30),
      ShortcutInfo::new("p", "priority").with_priority(31),
      ShortcutInfo::new("/", "search").with_priority(32),
      ShortcutInfo::new("c", "clear").with_priority(33),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
