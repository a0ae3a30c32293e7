use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Raw text changed (every edit)
  Changed(String),
  /// Esc pressed; text discarded
  Cleared,
  /// Search submitted (overlay closed, text persists)
  Submitted,
}

/// Search box opened with `/`. Text survives closing with Enter so it can
/// be edited again; Esc clears it.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Current raw text
  pub fn query(&self) -> &str {
    self.input.value()
  }

  /// Open for editing, keeping the previous text.
  pub fn activate(&mut self) {
    self.active = true;
    // Cursor back to the end of the kept text
    let current = self.input.value().to_string();
    self.input.set_value(&current);
  }

  /// Handle a key event
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted)
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Cleared)
      }
      InputResult::Changed => KeyResult::Event(SearchEvent::Changed(self.input.value().to_string())),
      InputResult::Consumed => KeyResult::Handled,
      // Swallow everything else while typing so view shortcuts stay inert
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Search universities ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let value = self.input.value();
    let split = value
      .char_indices()
      .nth(self.input.cursor_position())
      .map(|(i, _)| i)
      .unwrap_or(value.len());
    let (before, after) = value.split_at(split);

    let mut spans = vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ];
    if self.input.is_empty() {
      spans.push(Span::styled(
        " name contains...",
        Style::default().fg(Color::DarkGray),
      ));
    }
    let input_line = Line::from(spans);
    frame.render_widget(Paragraph::new(input_line), inner);
  }
}
