//! Transient, non-blocking notifications.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::error::ApiError;

const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_VISIBLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
  Info,
  Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
  pub level: ToastLevel,
  pub message: String,
  shown_at: Instant,
}

/// Shared toast queue. Views push, the app renders and expires.
#[derive(Debug, Clone, Default)]
pub struct Toasts {
  queue: Arc<Mutex<VecDeque<Toast>>>,
}

impl Toasts {
  pub fn new() -> Self {
    Self::default()
  }

  fn push(&self, level: ToastLevel, message: String) {
    let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
    queue.push_back(Toast {
      level,
      message,
      shown_at: Instant::now(),
    });
    while queue.len() > MAX_VISIBLE {
      queue.pop_front();
    }
  }

  pub fn info(&self, message: impl Into<String>) {
    self.push(ToastLevel::Info, message.into());
  }

  pub fn error(&self, action: &str, err: &ApiError) {
    let message = match &err.field {
      Some(field) => format!("{} failed: {} ({})", action, err.message, field),
      None => format!("{} failed: {}", action, err),
    };
    self.push(ToastLevel::Error, message);
  }

  /// Drop expired toasts. Returns `true` if any were removed.
  pub fn expire(&self) -> bool {
    let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
    let before = queue.len();
    queue.retain(|t| t.shown_at.elapsed() < TOAST_TTL);
    queue.len() != before
  }

  pub fn visible(&self) -> Vec<Toast> {
    let queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
    queue.iter().cloned().collect()
  }

  /// Stack the visible toasts in the bottom-right corner of `area`
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = (area.width / 3).clamp(24, 50).min(area.width);
    let mut bottom = area.y + area.height;

    for toast in self.visible().iter().rev() {
      let height = 3u16;
      if bottom < area.y + height {
        break;
      }
      bottom -= height;
      let rect = Rect::new(area.x + area.width - width, bottom, width, height);

      let (title, color) = match toast.level {
        ToastLevel::Info => (" ok ", Color::Green),
        ToastLevel::Error => (" error ", Color::Red),
      };
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);

      frame.render_widget(Clear, rect);
      frame.render_widget(
        Paragraph::new(toast.message.as_str())
          .block(block)
          .wrap(Wrap { trim: true }),
        rect,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_toast_names_action_and_field() {
    let toasts = Toasts::new();
    toasts.error("Create todo", &ApiError::validation("title", "too short"));
    let visible = toasts.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].level, ToastLevel::Error);
    assert_eq!(visible[0].message, "Create todo failed: too short (title)");
  }

  #[test]
  fn test_queue_is_bounded() {
    let toasts = Toasts::new();
    for i in 0..5 {
      toasts.info(format!("toast {}", i));
    }
    let visible = toasts.visible();
    assert_eq!(visible.len(), MAX_VISIBLE);
    assert_eq!(visible[0].message, "toast 2");
  }

  #[test]
  fn test_fresh_toasts_do_not_expire() {
    let toasts = Toasts::new();
    toasts.info("saved");
    assert!(!toasts.expire());
    assert_eq!(toasts.visible().len(), 1);
  }
}
