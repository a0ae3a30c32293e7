use crate::api::types::{University, UniversityHistoryEntry};
use crate::api::CachedApi;
use crate::query::QueryResult;
use crate::ui::renderfns::{format_date, format_timestamp, group_thousands, join_or_dash};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};

/// One university with its snapshot history
pub struct UniversityDetailView {
  id: String,
  name: String,
  api: CachedApi,
  history_limit: u32,
}

impl UniversityDetailView {
  pub fn new(id: String, name: String, api: CachedApi, history_limit: u32) -> Self {
    Self {
      id,
      name,
      api,
      history_limit,
    }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect, query: &QueryResult<University>) {
    let title = if query.is_loading() {
      format!(" {} (loading...) ", self.name)
    } else if query.is_fetching {
      format!(" {} (refreshing...) ", self.name)
    } else {
      format!(" {} ", self.name)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(uni) = query.data() else {
      let (text, color) = match query.error() {
        Some(err) => (
          format!("Failed to load university: {}\n\nPress 'r' to retry.", err),
          Color::Red,
        ),
        None => ("Loading university...".to_string(), Color::DarkGray),
      };
      let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(color));
      frame.render_widget(paragraph, inner);
      return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
      Line::from(vec![
        Span::styled("Researchers: ", label),
        Span::styled(group_thousands(uni.researchers_count), Style::default().bold()),
        Span::raw("   "),
        Span::styled("Students: ", label),
        Span::styled(group_thousands(uni.students_count), Style::default().bold()),
      ]),
      Line::from(vec![
        Span::styled("Hardware: ", label),
        Span::styled(join_or_dash(&uni.hardware_types), Style::default().fg(Color::Cyan)),
      ]),
      Line::from(vec![
        Span::styled("Point of contact: ", label),
        Span::raw(uni.point_of_contact.as_deref().unwrap_or("-")),
      ]),
      Line::from(vec![
        Span::styled("Added: ", label),
        Span::raw(format_timestamp(&uni.created_at.with_timezone(&Local))),
        Span::raw("   "),
        Span::styled("Last synced: ", label),
        Span::raw(format_timestamp(&uni.last_synced_at.with_timezone(&Local))),
      ]),
      Line::from(vec![
        Span::styled("Asana task: ", label),
        Span::raw(uni.asana_task_gid.as_str()),
      ]),
    ];

    // Refresh failed but older data is still shown
    if let Some(err) = query.error() {
      lines.push(Line::from(Span::styled(
        format!("Refresh failed: {}", err),
        Style::default().fg(Color::Red),
      )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn render_history(
    &self,
    frame: &mut Frame,
    area: Rect,
    query: &QueryResult<Vec<UniversityHistoryEntry>>,
  ) {
    let block = Block::default()
      .title(format!(" History (last {} snapshots) ", self.history_limit))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let entries = query.data().map(|v| v.as_slice()).unwrap_or(&[]);
    if entries.is_empty() {
      let text = match query.error() {
        Some(err) => format!("Failed to load history: {}", err),
        None if query.is_loading() => "Loading history...".to_string(),
        None => "No snapshots recorded yet.".to_string(),
      };
      let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = Row::new(["Date", "Researchers", "Students", "Hardware"])
      .style(Style::default().fg(Color::Yellow).bold());

    let rows = entries.iter().map(|entry| {
      Row::new(vec![
        Cell::from(format_date(entry.date)),
        Cell::from(group_thousands(entry.researchers_count)),
        Cell::from(group_thousands(entry.students_count)),
        Cell::from(join_or_dash(&entry.hardware_types)),
      ])
    });

    let table = Table::new(
      rows,
      [
        Constraint::Length(14),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Min(10),
      ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
  }
}

impl View for UniversityDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.api.refetch_university(&self.id, self.history_limit);
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let detail = self.api.university(&self.id);
    let history = self.api.university_history(&self.id, self.history_limit);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(9), Constraint::Min(3)])
      .split(area);

    self.render_detail(frame, chunks[0], &detail);
    self.render_history(frame, chunks[1], &history);
  }

  fn breadcrumb_label(&self) -> String {
    self.name.clone()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
