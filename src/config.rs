use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::SyncSettings;

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "UNIDASH_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub sync: SyncConfig,
  pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8000/api/v1".to_string(),
      timeout_secs: 30,
    }
  }
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Age after which cached reads are refetched on next use
  pub stale_time_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time_secs: 5 * 60,
    }
  }
}

impl CacheConfig {
  pub fn stale_time(&self) -> Duration {
    Duration::from_secs(self.stale_time_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  pub fast_poll_ms: u64,
  pub slow_poll_secs: u64,
  pub settle_delay_ms: u64,
  pub auto_sync_on_start: bool,
  /// Refresh metrics and universities even when the trigger call fails
  pub settle_after_failed_trigger: bool,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      fast_poll_ms: 2000,
      slow_poll_secs: 3600,
      settle_delay_ms: 1000,
      auto_sync_on_start: true,
      settle_after_failed_trigger: true,
    }
  }
}

impl SyncConfig {
  pub fn settings(&self) -> SyncSettings {
    SyncSettings {
      fast_poll: Duration::from_millis(self.fast_poll_ms),
      slow_poll: Duration::from_secs(self.slow_poll_secs),
      settle_delay: Duration::from_millis(self.settle_delay_ms),
      auto_sync_on_mount: self.auto_sync_on_start,
      settle_after_failed_trigger: self.settle_after_failed_trigger,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
  /// Title shown in the header
  pub title: String,
  pub search_debounce_ms: u64,
  pub timeline_days: u32,
  pub growth_period_days: u32,
  /// Snapshots shown in the university detail view
  pub history_limit: u32,
}

impl Default for DashboardConfig {
  fn default() -> Self {
    Self {
      title: "Academic Program Dashboard".to_string(),
      search_debounce_ms: 300,
      timeline_days: 90,
      growth_period_days: 30,
      history_limit: 30,
    }
  }
}

impl DashboardConfig {
  pub fn search_debounce(&self) -> Duration {
    Duration::from_millis(self.search_debounce_ms)
  }
}

impl Config {
  /// Load configuration from file, falling back to defaults.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./unidash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/unidash/config.yaml
  ///
  /// `UNIDASH_API_URL` then overrides the API base URL.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
      if !url.trim().is_empty() {
        config.api.base_url = url.trim().to_string();
      }
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("unidash.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("unidash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file deserializes to null, which should mean "all defaults"
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Reject values the service or the UI cannot work with.
  pub fn validate(&self) -> Result<()> {
    let d = &self.dashboard;
    if !(7..=365).contains(&d.growth_period_days) {
      return Err(eyre!(
        "dashboard.growth_period_days must be between 7 and 365, got {}",
        d.growth_period_days
      ));
    }
    if !(1..=365).contains(&d.history_limit) {
      return Err(eyre!(
        "dashboard.history_limit must be between 1 and 365, got {}",
        d.history_limit
      ));
    }
    if d.timeline_days == 0 {
      return Err(eyre!("dashboard.timeline_days must be positive"));
    }
    if self.sync.fast_poll_ms == 0 || self.sync.slow_poll_secs == 0 {
      return Err(eyre!("sync poll intervals must be positive"));
    }
    Ok(())
  }
}
