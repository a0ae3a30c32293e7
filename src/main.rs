mod api;
mod app;
mod commands;
mod config;
mod event;
mod logging;
mod query;
mod roster;
mod sync;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "unidash")]
#[command(about = "A terminal dashboard for university program metrics with live sync tracking")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/unidash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Dashboard service base URL (overrides config and UNIDASH_API_URL)
  #[arg(long)]
  api_url: Option<String>,

  /// Don't start a sync when the dashboard opens
  #[arg(long)]
  no_auto_sync: bool,

  /// Print current metrics and sync status as JSON and exit
  #[arg(long, conflicts_with = "sync")]
  summary: bool,

  /// Trigger a sync with a snapshot, print the service's reply and exit
  #[arg(long)]
  sync: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  // Load configuration, then apply command line overrides
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url {
    config.api.base_url = url;
  }
  if args.no_auto_sync {
    config.sync.auto_sync_on_start = false;
  }
  info!(base_url = %config.api.base_url, "starting unidash");

  if args.summary {
    return print_summary(&config).await;
  }
  if args.sync {
    return run_sync(&config).await;
  }

  let mut app = app::App::new(config)?;
  app.run().await
}

async fn print_summary(config: &config::Config) -> Result<()> {
  let api = app::connect(config)?;
  let (metrics, status) = tokio::try_join!(api.load_current_metrics(), api.load_sync_status())?;

  let summary = serde_json::json!({
    "metrics": metrics,
    "sync": status,
  });
  println!("{}", serde_json::to_string_pretty(&summary)?);
  Ok(())
}

async fn run_sync(config: &config::Config) -> Result<()> {
  let api = app::connect(config)?;
  let coordinator = sync::SyncCoordinator::new(&api, config.sync.settings());
  let response = coordinator.trigger_and_wait(true).await?;
  println!("{}", serde_json::to_string_pretty(&response)?);
  Ok(())
}
