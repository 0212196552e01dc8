use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::error::ApiError;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// Enter on the last field
  Submitted,
  Cancelled,
}

#[derive(Debug, Clone)]
struct Field {
  /// Wire name, matched against `ApiError::field`
  name: &'static str,
  label: &'static str,
  input: TextInput,
  masked: bool,
}

/// Vertical stack of labelled text fields with one focused at a time.
#[derive(Debug, Clone)]
pub struct Form {
  title: String,
  fields: Vec<Field>,
  focused: usize,
  error: Option<ApiError>,
}

impl Form {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      fields: Vec::new(),
      focused: 0,
      error: None,
    }
  }

  pub fn field(mut self, name: &'static str, label: &'static str) -> Self {
    self.fields.push(Field {
      name,
      label,
      input: TextInput::new(),
      masked: false,
    });
    self
  }

  /// A field whose contents are drawn as `*`
  pub fn secret(mut self, name: &'static str, label: &'static str) -> Self {
    self.fields.push(Field {
      name,
      label,
      input: TextInput::new(),
      masked: true,
    });
    self
  }

  pub fn with_value(mut self, name: &str, value: &str) -> Self {
    if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
      field.input = TextInput::with_value(value);
    }
    self
  }

  pub fn value(&self, name: &str) -> &str {
    self
      .fields
      .iter()
      .find(|f| f.name == name)
      .map(|f| f.input.value())
      .unwrap_or("")
  }

  pub fn set_error(&mut self, err: ApiError) {
    if let Some(index) = err
      .field
      .as_deref()
      .and_then(|name| self.fields.iter().position(|f| f.name == name))
    {
      self.focused = index;
    }
    self.error = Some(err);
  }

  pub fn clear_error(&mut self) {
    self.error = None;
  }

  /// Empty every field and focus the first
  pub fn reset(&mut self) {
    for field in &mut self.fields {
      field.input.clear();
    }
    self.focused = 0;
    self.error = None;
  }

  fn focus_next(&mut self) {
    if !self.fields.is_empty() {
      self.focused = (self.focused + 1) % self.fields.len();
    }
  }

  fn focus_previous(&mut self) {
    if !self.fields.is_empty() {
      self.focused = (self.focused + self.fields.len() - 1) % self.fields.len();
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus_next();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus_previous();
        return KeyResult::Handled;
      }
      _ => {}
    }

    let Some(field) = self.fields.get_mut(self.focused) else {
      return KeyResult::NotHandled;
    };
    match field.input.handle_key(key) {
      InputResult::Submitted(_) => {
        if self.focused + 1 < self.fields.len() {
          self.focused += 1;
          KeyResult::Handled
        } else {
          KeyResult::Event(FormEvent::Submitted)
        }
      }
      InputResult::Cancelled => KeyResult::Event(FormEvent::Cancelled),
      InputResult::Consumed => {
        if self
          .error
          .as_ref()
          .is_some_and(|e| e.field.as_deref() == Some(field.name))
        {
          self.error = None;
        }
        KeyResult::Handled
      }
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Height needed to draw every field plus the message line and border
  pub fn height(&self) -> u16 {
    self.fields.len() as u16 * 3 + 4
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, busy: bool) {
    let title = if busy {
      format!(" {} (working...) ", self.title)
    } else {
      format!(" {} ", self.title)
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut constraints: Vec<Constraint> = self.fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Min(1));
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints(constraints)
      .split(inner);

    for (i, field) in self.fields.iter().enumerate() {
      let focused = i == self.focused;
      let has_error = self
        .error
        .as_ref()
        .is_some_and(|e| e.field.as_deref() == Some(field.name));
      let color = if has_error {
        Color::Red
      } else if focused {
        Color::Yellow
      } else {
        Color::DarkGray
      };

      let shown: String = if field.masked {
        "*".repeat(field.input.value().chars().count())
      } else {
        field.input.value().to_string()
      };
      let spans = if focused {
        let split = shown
          .char_indices()
          .nth(field.input.cursor_position())
          .map(|(i, _)| i)
          .unwrap_or(shown.len());
        vec![
          Span::raw(shown[..split].to_string()),
          Span::styled("_", Style::default().fg(Color::Yellow)),
          Span::raw(shown[split..].to_string()),
        ]
      } else {
        vec![Span::raw(shown)]
      };

      let block = Block::default()
        .title(format!(" {} ", field.label))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
      frame.render_widget(Paragraph::new(Line::from(spans)).block(block), rows[i]);
    }

    if let Some(err) = &self.error {
      let message = Paragraph::new(err.message.as_str())
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true });
      frame.render_widget(message, rows[self.fields.len()]);
    }
  }
}
