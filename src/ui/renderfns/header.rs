use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::api::types::User;

/// Draw the header bar: app name, server host, and who is logged in
pub fn draw_header(frame: &mut Frame, area: Rect, server_url: &str, identity: Option<&User>) {
  let host = extract_host(server_url);

  let mut spans = vec![
    Span::styled(" taskdeck ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
  ];

  match identity {
    Some(user) => {
      spans.push(Span::styled(
        format!(" {} ", user.email),
        Style::default().fg(Color::Yellow).bold(),
      ));
      if user.is_admin() {
        spans.push(Span::styled(
          "[admin]",
          Style::default().fg(Color::Magenta).bold(),
        ));
      }
    }
    None => spans.push(Span::styled(
      " not logged in ",
      Style::default().fg(Color::DarkGray),
    )),
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host (and port) part of the server URL
fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_host() {
    assert_eq!(extract_host("https://todo.example.com"), "todo.example.com");
    assert_eq!(extract_host("https://todo.example.com/api"), "todo.example.com");
    assert_eq!(extract_host("http://localhost:8080/api"), "localhost:8080");
  }
}
