use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Yes/no prompt guarding a destructive action.
///
/// `T` identifies what is being confirmed (e.g. the id to delete) and is
/// handed back on `y`.
#[derive(Debug, Clone, Default)]
pub struct Confirm<T> {
  pending: Option<(String, T)>,
}

impl<T: Clone> Confirm<T> {
  pub fn new() -> Self {
    Self { pending: None }
  }

  pub fn is_active(&self) -> bool {
    self.pending.is_some()
  }

  pub fn ask(&mut self, prompt: impl Into<String>, subject: T) {
    self.pending = Some((prompt.into(), subject));
  }

  /// `y` confirms, `n`/Esc dismisses; every other key is swallowed while open
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<T> {
    if self.pending.is_none() {
      return KeyResult::NotHandled;
    }
    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') => match self.pending.take() {
        Some((_, subject)) => KeyResult::Event(subject),
        None => KeyResult::Handled,
      },
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
        self.pending = None;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some((prompt, _)) = &self.pending else {
      return;
    };

    let width = (area.width / 2).clamp(30, 60).min(area.width);
    let height = 5.min(area.height);
    let rect = Rect::new(
      area.x + (area.width - width) / 2,
      area.y + (area.height - height) / 2,
      width,
      height,
    );

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Confirm ");

    let text = vec![
      Line::from(prompt.as_str()),
      Line::from(vec![
        Span::styled("y", Style::default().fg(Color::Cyan).bold()),
        Span::styled(" yes   ", Style::default().fg(Color::DarkGray)),
        Span::styled("n", Style::default().fg(Color::Cyan).bold()),
        Span::styled(" no", Style::default().fg(Color::DarkGray)),
      ]),
    ];

    frame.render_widget(Clear, rect);
    frame.render_widget(
      Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
      rect,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_inactive_passes_keys_through() {
    let mut confirm: Confirm<i64> = Confirm::new();
    assert_eq!(confirm.handle_key(key(KeyCode::Char('y'))), KeyResult::NotHandled);
  }

  #[test]
  fn test_yes_returns_subject_once() {
    let mut confirm = Confirm::new();
    confirm.ask("Delete todo 3?", 3i64);
    assert_eq!(confirm.handle_key(key(KeyCode::Char('j'))), KeyResult::Handled);
    assert_eq!(confirm.handle_key(key(KeyCode::Char('y'))), KeyResult::Event(3));
    assert!(!confirm.is_active());
  }

  #[test]
  fn test_no_dismisses() {
    let mut confirm = Confirm::new();
    confirm.ask("Delete?", ());
    assert_eq!(confirm.handle_key(key(KeyCode::Esc)), KeyResult::Handled);
    assert!(!confirm.is_active());
  }
}
