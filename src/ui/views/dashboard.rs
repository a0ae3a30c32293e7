use std::sync::Arc;
use std::time::Duration;

use crate::api::types::{
  CurrentMetrics, GrowthMetrics, HardwareDistribution, MetricsTimeline, SyncHistory, SyncOutcome,
  University, UniversityList,
};
use crate::api::CachedApi;
use crate::commands::CommandAction;
use crate::query::QueryResult;
use crate::roster::{RosterComposer, SortField};
use crate::sync::SyncCoordinator;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{
  format_growth, format_last_sync, format_timestamp, group_thousands, join_or_dash, outcome_color,
  outcome_label, sparkline, truncate, GrowthClass,
};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::UniversityDetailView;
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};
use tokio::time::Instant;

/// Sync runs listed in the sync panel
const RECENT_SYNC_RUNS: u32 = 3;

const EMPTY_TIMELINE: &str = "No historical data available. Sync data to see growth trends.";
const EMPTY_ROSTER: &str = "No universities found. Sync data from Asana to populate this table.";

#[derive(Debug, Clone)]
pub struct DashboardSettings {
  pub timeline_days: u32,
  pub growth_period_days: u32,
  pub history_limit: u32,
  pub search_debounce: Duration,
}

/// Root view: metric cards, sync panel, trends and the university roster
pub struct DashboardView {
  api: CachedApi,
  sync: Arc<SyncCoordinator>,
  settings: DashboardSettings,
  composer: RosterComposer,
  search: SearchInput,
  table_state: TableState,
}

impl DashboardView {
  pub fn new(api: CachedApi, sync: Arc<SyncCoordinator>, settings: DashboardSettings) -> Self {
    let composer = RosterComposer::new(settings.search_debounce);
    Self {
      api,
      sync,
      settings,
      composer,
      search: SearchInput::new(),
      table_state: TableState::default(),
    }
  }

  fn roster(&self) -> QueryResult<UniversityList> {
    self.api.universities(self.composer.query())
  }

  fn selected_university(&self) -> Option<University> {
    let idx = self.table_state.selected()?;
    self.roster().data.and_then(|list| list.universities.into_iter().nth(idx))
  }

  fn query_changed(&mut self) {
    self.table_state.select(Some(0));
  }

  fn render_status(&self, frame: &mut Frame, area: Rect, metrics: &QueryResult<CurrentMetrics>) {
    let (text, color) = match metrics.error() {
      Some(err) => (
        format!(
          "Failed to load dashboard data. Make sure the backend is running.\n\n{}\n\nPress 'r' to retry.",
          err
        ),
        Color::Red,
      ),
      None => ("Loading metrics...".to_string(), Color::DarkGray),
    };
    let paragraph = Paragraph::new(text)
      .wrap(Wrap { trim: true })
      .alignment(Alignment::Center)
      .block(Block::default().borders(Borders::ALL))
      .style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
  }

  fn render_cards(
    &self,
    frame: &mut Frame,
    area: Rect,
    metrics: &CurrentMetrics,
    growth: Option<&GrowthMetrics>,
  ) {
    let chunks = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Ratio(1, 4); 4])
      .split(area);

    let cards = [
      (
        "Universities Engaged",
        metrics.total_universities,
        growth.map(|g| g.universities_growth),
      ),
      (
        "Universities with TT Hardware",
        metrics.universities_with_tt_hardware,
        None,
      ),
      (
        "Researchers on TT Hardware",
        metrics.researchers_on_tt_hardware,
        growth.map(|g| g.researchers_growth),
      ),
      (
        "Students on TT Hardware",
        metrics.students_on_tt_hardware,
        growth.map(|g| g.students_growth),
      ),
    ];

    for ((title, value, growth), chunk) in cards.into_iter().zip(chunks.iter()) {
      self.render_card(frame, *chunk, title, value, growth);
    }
  }

  fn render_card(&self, frame: &mut Frame, area: Rect, title: &str, value: u64, growth: Option<f64>) {
    let block = Block::default()
      .title(format!(" {} ", truncate(title, area.width.saturating_sub(4) as usize)))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let mut lines = vec![Line::from(Span::styled(
      group_thousands(value),
      Style::default().fg(Color::White).bold(),
    ))];
    if let Some(growth) = growth {
      lines.push(Line::from(vec![
        Span::styled(
          format_growth(growth),
          Style::default().fg(GrowthClass::of(growth).color()),
        ),
        Span::styled(
          format!(" vs {} days ago", self.settings.growth_period_days),
          Style::default().fg(Color::DarkGray),
        ),
      ]));
    }

    let paragraph = Paragraph::new(lines)
      .block(block)
      .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
  }

  fn render_sync(&self, frame: &mut Frame, area: Rect, history: &QueryResult<SyncHistory>) {
    let syncing = self.sync.is_syncing();
    let block = Block::default()
      .title(format!(" Sync ({}) ", self.sync.phase().label()))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(if syncing { Color::Yellow } else { Color::Blue }));

    let button = if syncing {
      Line::from(Span::styled(
        "⟳ Syncing...",
        Style::default().fg(Color::Yellow).bold(),
      ))
    } else {
      Line::from(vec![
        Span::styled("<s>", Style::default().fg(Color::Cyan)),
        Span::raw(" Sync from Asana"),
      ])
    };
    let mut lines = vec![button];

    let status = self.sync.status();
    let last = status.data();
    let mut last_line = vec![Span::styled(
      format_last_sync(last.and_then(|s| s.last_sync_at)),
      Style::default().fg(Color::DarkGray),
    )];
    if last.and_then(|s| s.last_sync_status) == Some(SyncOutcome::Failed) {
      last_line.push(Span::styled(" (Failed)", Style::default().fg(Color::Red)));
    }
    lines.push(Line::from(last_line));

    if let Some(tasks) = last.and_then(|s| s.last_sync_tasks) {
      lines.push(Line::from(Span::styled(
        format!("Tasks synced: {}", group_thousands(tasks)),
        Style::default().fg(Color::DarkGray),
      )));
    }

    if let Some(err) = self.sync.error() {
      lines.push(Line::from(Span::styled(
        format!("Sync error: {}", err),
        Style::default().fg(Color::Red),
      )));
    }

    if let Some(history) = history.data() {
      for run in &history.history {
        let mut spans = vec![
          Span::styled(format!("#{:<4}", run.id), Style::default().fg(Color::DarkGray)),
          Span::styled(
            format!("{:<11}", outcome_label(run.status)),
            Style::default().fg(outcome_color(run.status)),
          ),
          Span::raw(format!("{:>5} tasks  ", run.tasks_synced)),
          Span::styled(
            format_timestamp(&run.started_at.with_timezone(&Local)),
            Style::default().fg(Color::DarkGray),
          ),
        ];
        if let Some(msg) = &run.error_message {
          spans.push(Span::styled(
            format!("  {}", truncate(msg, 40)),
            Style::default().fg(Color::Red),
          ));
        }
        lines.push(Line::from(spans));
      }
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn render_timeline(&self, frame: &mut Frame, area: Rect, timeline: &QueryResult<MetricsTimeline>) {
    let block = Block::default()
      .title(format!(" Growth ({} days) ", self.settings.timeline_days))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner_width = area.width.saturating_sub(16) as usize;

    let points = timeline.data().map(|t| t.data.as_slice()).unwrap_or(&[]);
    if points.is_empty() {
      let text = match timeline.error() {
        Some(err) => format!("Failed to load timeline: {}", err),
        None if timeline.is_loading() => "Loading timeline...".to_string(),
        None => EMPTY_TIMELINE.to_string(),
      };
      let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let series: [(&str, Vec<u64>, Color); 3] = [
      (
        "Universities",
        points.iter().map(|p| p.universities).collect(),
        Color::Cyan,
      ),
      (
        "Researchers",
        points.iter().map(|p| p.researchers).collect(),
        Color::Green,
      ),
      (
        "Students",
        points.iter().map(|p| p.students).collect(),
        Color::Magenta,
      ),
    ];

    let mut lines: Vec<Line> = series
      .iter()
      .map(|(label, values, color)| {
        Line::from(vec![
          Span::styled(format!("{:<13}", label), Style::default().fg(Color::DarkGray)),
          Span::styled(sparkline(values, inner_width), Style::default().fg(*color)),
        ])
      })
      .collect();

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
      lines.push(Line::from(Span::styled(
        format!("{} → {}", first.date, last.date),
        Style::default().fg(Color::DarkGray),
      )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn render_hardware(&self, frame: &mut Frame, area: Rect, dist: &QueryResult<HardwareDistribution>) {
    let block = Block::default()
      .title(" Hardware ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(dist) = dist.data().filter(|d| !d.is_empty()) else {
      let paragraph = Paragraph::new("No hardware recorded.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let max = dist.values().copied().max().unwrap_or(1).max(1);
    let bar_width = area.width.saturating_sub(20).max(1) as u64;

    let mut entries: Vec<(&String, &u64)> = dist.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let lines: Vec<Line> = entries
      .into_iter()
      .map(|(label, count)| {
        let filled = (count * bar_width).div_ceil(max) as usize;
        Line::from(vec![
          Span::raw(format!("{:<12}", truncate(label, 12))),
          Span::styled("█".repeat(filled), Style::default().fg(Color::Cyan)),
          Span::raw(format!(" {}", count)),
        ])
      })
      .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn render_roster(&mut self, frame: &mut Frame, area: Rect) {
    let roster = self.roster();
    let query = self.composer.query();
    let universities = roster.data().map(|l| l.universities.as_slice()).unwrap_or(&[]);
    ensure_valid_selection(&mut self.table_state, universities.len());

    let mut title = match roster.data() {
      Some(list) => format!(" Universities ({})", list.total),
      None => " Universities".to_string(),
    };
    if let Some(search) = &query.search {
      title.push_str(&format!(" [search: {}]", search));
    }
    if query.has_hardware {
      title.push_str(" [TT hardware only]");
    }
    if roster.is_fetching || self.composer.is_search_pending() {
      title.push_str(" (loading...)");
    }
    title.push(' ');

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if universities.is_empty() {
      let text = match roster.error() {
        Some(err) => format!("Failed to load universities: {}", err),
        None if roster.is_loading() => "Loading universities...".to_string(),
        None => EMPTY_ROSTER.to_string(),
      };
      let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let sorted = |field: SortField, label: &'static str| -> Cell<'static> {
      if query.sort == field {
        Cell::from(format!("{} ▼", label)).style(Style::default().fg(Color::Cyan).bold())
      } else {
        Cell::from(label)
      }
    };
    let header = Row::new(vec![
      sorted(SortField::Name, "University"),
      sorted(SortField::ResearcherCount, "Researchers"),
      sorted(SortField::StudentCount, "Students"),
      Cell::from("Hardware"),
      Cell::from("Point of Contact"),
      sorted(SortField::CreatedAt, "Added"),
    ])
    .style(Style::default().fg(Color::Yellow).bold());

    let rows: Vec<Row> = universities
      .iter()
      .map(|uni| {
        Row::new(vec![
          Cell::from(uni.university_name.clone()),
          Cell::from(group_thousands(uni.researchers_count)),
          Cell::from(group_thousands(uni.students_count)),
          Cell::from(join_or_dash(&uni.hardware_types)).style(Style::default().fg(Color::Cyan)),
          Cell::from(uni.point_of_contact.clone().unwrap_or_else(|| "-".to_string())),
          Cell::from(uni.created_at.with_timezone(&Local).format("%b %-d, %Y").to_string()),
        ])
      })
      .collect();

    // Refresh failed but the previous roster is still shown
    let footer = roster.error().map(|err| {
      Row::new(vec![Cell::from(format!("Refresh failed: {}", err))])
        .style(Style::default().fg(Color::Red))
    });

    let mut table = Table::new(
      rows,
      [
        Constraint::Min(24),
        Constraint::Length(13),
        Constraint::Length(10),
        Constraint::Length(20),
        Constraint::Length(22),
        Constraint::Length(14),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("> ");
    if let Some(footer) = footer {
      table = table.footer(footer);
    }

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Let search component try to handle first
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(text)) => {
        self.composer.set_search(text);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Cleared) => {
        if self.composer.clear_search() {
          self.query_changed();
        }
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.table_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => self.table_state.select_last(),
      KeyCode::Char('s') => return ViewAction::Command(CommandAction::Sync),
      KeyCode::Char('r') => return ViewAction::Command(CommandAction::Refresh),
      KeyCode::Char('h') => {
        if self.composer.toggle_hardware_filter() {
          self.query_changed();
        }
      }
      KeyCode::Char('o') => {
        let next = self.composer.query().sort.next();
        if self.composer.set_sort(next) {
          self.query_changed();
        }
      }
      KeyCode::Char(c @ '1'..='4') => {
        let idx = c as usize - '1' as usize;
        if self.composer.set_sort(SortField::ALL[idx]) {
          self.query_changed();
        }
      }
      KeyCode::Enter => {
        if let Some(uni) = self.selected_university() {
          return ViewAction::Push(Box::new(UniversityDetailView::new(
            uni.asana_task_gid,
            uni.university_name,
            self.api.clone(),
            self.settings.history_limit,
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let metrics = self.api.current_metrics();
    let growth = self.api.growth(self.settings.growth_period_days);
    let timeline = self.api.timeline(self.settings.timeline_days);
    let hardware = self.api.hardware_distribution();
    let history = self.api.sync_history(RECENT_SYNC_RUNS);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(4), // Metric cards
        Constraint::Length(8), // Sync, trends, hardware
        Constraint::Min(5),    // Roster
      ])
      .split(area);

    match metrics.data() {
      Some(current) => self.render_cards(frame, chunks[0], current, growth.data()),
      None => self.render_status(frame, chunks[0], &metrics),
    }

    let panels = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([
        Constraint::Percentage(38),
        Constraint::Percentage(37),
        Constraint::Percentage(25),
      ])
      .split(chunks[1]);
    self.render_sync(frame, panels[0], &history);
    self.render_timeline(frame, panels[1], &timeline);
    self.render_hardware(frame, panels[2], &hardware);

    self.render_roster(frame, chunks[2]);
    self.search.render_overlay(frame, chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    "Dashboard".to_string()
  }

  fn tick(&mut self) {
    if self.composer.tick() {
      self.query_changed();
    }
  }

  fn deadline(&self) -> Option<Instant> {
    self.composer.deadline()
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let sync = if self.sync.is_syncing() {
      ShortcutInfo::new("s", "syncing...")
    } else {
      ShortcutInfo::new("s", "sync")
    };
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      sync.with_priority(30),
      ShortcutInfo::new("o", "sort").with_priority(40),
      ShortcutInfo::new("h", "hardware filter").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
