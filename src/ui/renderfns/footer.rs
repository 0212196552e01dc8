use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::view::ShortcutInfo;

/// Draw the footer: view breadcrumb on the left, key hints after it
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], shortcuts: &[ShortcutInfo]) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i + 1 == breadcrumb.len() {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let mut visible: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  visible.sort_by_key(|s| s.priority);

  if !visible.is_empty() {
    spans.push(Span::styled("  │", Style::default().fg(Color::DarkGray)));
  }
  for shortcut in visible {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
