use crate::api::{keys, ApiClient, CachedApi};
use crate::commands::CommandAction;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::query::QueryCache;
use crate::sync::SyncCoordinator;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{DashboardSettings, DashboardView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

const TICK_RATE: Duration = Duration::from_millis(250);

/// Build the HTTP client and the shared cache in front of it.
pub fn connect(config: &Config) -> Result<CachedApi> {
  let client = ApiClient::new(&config.api.base_url, config.api.timeout())?;
  info!(base_url = %client.base_url(), "using dashboard service");
  let cache = QueryCache::new(config.cache.stale_time());
  Ok(CachedApi::new(Arc::new(client), cache))
}

/// Main application state
pub struct App {
  config: Config,
  api: CachedApi,
  sync: Arc<SyncCoordinator>,
  /// Navigation stack - the dashboard is always at index 0
  view_stack: Vec<Box<dyn View>>,
  command: CommandInput,
  /// One-line notice in the footer, cleared by the next key
  message: Option<String>,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let api = connect(&config)?;
    Ok(Self::with_api(config, api))
  }

  pub fn with_api(config: Config, api: CachedApi) -> Self {
    let sync = Arc::new(SyncCoordinator::new(&api, config.sync.settings()));
    let settings = DashboardSettings {
      timeline_days: config.dashboard.timeline_days,
      growth_period_days: config.dashboard.growth_period_days,
      history_limit: config.dashboard.history_limit,
      search_debounce: config.dashboard.search_debounce(),
    };
    let root = DashboardView::new(api.clone(), sync.clone(), settings);

    Self {
      config,
      api,
      sync,
      view_stack: vec![Box::new(root)],
      command: CommandInput::new(),
      message: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    self.sync.mount();
    let result = self.event_loop(&mut terminal).await;
    self.sync.unmount();

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    let mut changes = self.api.cache().changes();

    while !self.should_quit {
      if let Some(view) = self.view_stack.last_mut() {
        view.tick();
      }
      terminal.draw(|frame| ui::draw(frame, self))?;

      // Wake on input, on any cache update, or when the view has timed work
      let deadline = self.view_stack.last().and_then(|v| v.deadline());
      tokio::select! {
        event = events.next() => match event {
          Some(event) => self.handle_event(event),
          None => break,
        },
        Ok(()) = changes.changed() => {}
        _ = sleep_until(deadline) => {}
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Resize | Event::Tick => {} // Redrawn by the loop
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    self.message = None;

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // The command palette only opens when the view isn't taking text input
    let capturing = self
      .view_stack
      .last()
      .is_some_and(|view| view.is_capturing_input());
    if self.command.is_active() || !capturing {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(action)) => return self.execute(action),
        KeyResult::Event(CommandEvent::Unknown(input)) => {
          self.message = Some(format!("Unknown command: {}", input));
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => return,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Command(action) => self.execute(action),
    }
  }

  fn execute(&mut self, action: CommandAction) {
    match action {
      CommandAction::Dashboard => self.view_stack.truncate(1),
      CommandAction::Sync => {
        if self.sync.is_syncing() {
          self.message = Some("A sync is already running".to_string());
        } else {
          // Outcome is reported through the coordinator
          drop(self.sync.trigger(true));
          self.message = Some("Sync started".to_string());
        }
      }
      CommandAction::Refresh => {
        let cache = self.api.cache();
        let n = cache.invalidate(&keys::metrics()) + cache.invalidate(&keys::universities());
        info!(entries = n, "manual refresh");
        self.message = Some("Refreshing...".to_string());
      }
      CommandAction::Quit => self.should_quit = true,
    }
  }

  // Accessors for UI rendering
  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn title(&self) -> &str {
    &self.config.dashboard.title
  }

  pub fn api_url(&self) -> &str {
    &self.config.api.base_url
  }

  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .view_stack
      .last()
      .map(|view| view.shortcuts())
      .unwrap_or_default()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
  match deadline {
    Some(deadline) => tokio::time::sleep_until(deadline).await,
    None => std::future::pending().await,
  }
}
