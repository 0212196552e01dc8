/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Only offered to identities with the admin capability
  pub admin_only: bool,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "todos",
    aliases: &["t", "todo", "dashboard"],
    description: "Your todo list",
    admin_only: false,
  },
  Command {
    name: "users",
    aliases: &["u", "user", "admin"],
    description: "Manage user accounts",
    admin_only: true,
  },
  Command {
    name: "settings",
    aliases: &["s", "account", "password"],
    description: "Change password or delete account",
    admin_only: false,
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "End the session",
    admin_only: false,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit taskdeck",
    admin_only: false,
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str, is_admin: bool) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();
  let available = COMMANDS.iter().filter(|cmd| is_admin || !cmd.admin_only);

  if input_lower.is_empty() {
    return available.collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in available {
    if let Some(rank) = rank(cmd, &input_lower) {
      matches.push((cmd, rank));
    }
  }

  // Stable: equal ranks keep declaration order
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; `None` means no match.
fn rank(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}
