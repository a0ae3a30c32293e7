use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use tokio::time::Instant;

use crate::commands::CommandAction;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back; quits from the root)
  Pop,
  /// Run an application-level command
  Command(CommandAction),
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, etc.) and return actions
/// for the App to execute: App → View → Components
///
/// Views read data through `CachedApi` while rendering; the cache decides
/// whether that needs a request.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called before every draw
  fn tick(&mut self) {}

  /// Earliest instant at which `tick` has work to do, so the App can wake
  /// up for it instead of waiting on input
  fn deadline(&self) -> Option<Instant> {
    None
  }

  /// True while the view owns the keyboard (text entry), so global keys
  /// like `:` are passed through
  fn is_capturing_input(&self) -> bool {
    false
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
