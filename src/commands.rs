/// Available commands and autocomplete logic

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
  /// Return to the dashboard root
  Dashboard,
  /// Trigger a sync with a snapshot
  Sync,
  /// Invalidate metrics and roster
  Refresh,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: CommandAction,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "dashboard",
    aliases: &["d", "home", "main"],
    description: "Back to the dashboard",
    action: CommandAction::Dashboard,
  },
  Command {
    name: "sync",
    aliases: &["s", "asana"],
    description: "Sync data from Asana",
    action: CommandAction::Sync,
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Reload metrics and universities",
    action: CommandAction::Refresh,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit unidash",
    action: CommandAction::Quit,
  },
];

/// Resolve exactly typed input (name or alias) to a command.
pub fn find(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&'static Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_priority(cmd, &input_lower).map(|p| (cmd, p)))
    .collect();

  // Stable sort keeps table order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better. None when the command does not match at all.
fn match_priority(cmd: &Command, input: &str) -> Option<u32> {
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
