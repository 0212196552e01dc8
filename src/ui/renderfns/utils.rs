use ratatui::prelude::Color;

/// Truncate to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a todo priority (1 = highest)
pub fn priority_color(priority: u8) -> Color {
  match priority {
    1 => Color::Red,
    2 => Color::LightRed,
    3 => Color::Yellow,
    4 => Color::Green,
    _ => Color::DarkGray,
  }
}
