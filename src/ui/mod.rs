pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::TableState;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let mut shortcuts = app.shortcuts();
  shortcuts.sort_by_key(|s| s.priority);
  renderfns::draw_header(frame, chunks[0], app.title(), app.api_url(), &shortcuts);

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }
  app.command_input().render_overlay(frame, chunks[1]);

  let breadcrumb = app.view_breadcrumb();
  renderfns::draw_footer(frame, chunks[2], &breadcrumb, app.message());
}

/// Keep a table selection inside `0..len`, selecting the first row when
/// rows appear and clearing it when they disappear.
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  match (state.selected(), len) {
    (_, 0) => state.select(None),
    (None, _) => state.select(Some(0)),
    (Some(i), len) if i >= len => state.select(Some(len - 1)),
    _ => {}
  }
}
