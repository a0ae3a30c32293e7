use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use ratatui::prelude::Color;
use std::fmt::Display;

use crate::api::types::SyncOutcome;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthClass {
  Positive,
  Neutral,
  Negative,
}

impl GrowthClass {
  pub fn of(growth: f64) -> Self {
    if growth > 0.0 {
      GrowthClass::Positive
    } else if growth < 0.0 {
      GrowthClass::Negative
    } else {
      GrowthClass::Neutral
    }
  }

  pub fn color(&self) -> Color {
    match self {
      GrowthClass::Positive => Color::Green,
      GrowthClass::Neutral => Color::DarkGray,
      GrowthClass::Negative => Color::Red,
    }
  }
}

/// One decimal, explicit `+` for growth, sign kept for decline.
pub fn format_growth(growth: f64) -> String {
  let prefix = if growth > 0.0 { "+" } else { "" };
  format!("{}{:.1}%", prefix, growth)
}

/// `Jan 5, 2025 3:07 PM`
pub fn format_timestamp<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
  Tz::Offset: Display,
{
  dt.format("%b %-d, %Y %-I:%M %p").to_string()
}

pub fn format_date(date: NaiveDate) -> String {
  date.format("%b %-d, %Y").to_string()
}

/// Sync line for the sync panel, in local time.
pub fn format_last_sync(last_sync_at: Option<DateTime<Utc>>) -> String {
  match last_sync_at {
    None => "Never synced".to_string(),
    Some(at) => format!("Last synced: {}", format_timestamp(&at.with_timezone(&Local))),
  }
}

pub fn outcome_color(outcome: SyncOutcome) -> Color {
  match outcome {
    SyncOutcome::Success => Color::Green,
    SyncOutcome::Failed => Color::Red,
    SyncOutcome::InProgress => Color::Yellow,
    SyncOutcome::Unknown => Color::White,
  }
}

pub fn outcome_label(outcome: SyncOutcome) -> &'static str {
  match outcome {
    SyncOutcome::Success => "success",
    SyncOutcome::Failed => "failed",
    SyncOutcome::InProgress => "in progress",
    SyncOutcome::Unknown => "unknown",
  }
}

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Unicode block sparkline of the last `width` values, scaled to the
/// largest of them.
pub fn sparkline(values: &[u64], width: usize) -> String {
  let shown = &values[values.len().saturating_sub(width)..];
  let max = shown.iter().copied().max().unwrap_or(0);
  shown
    .iter()
    .map(|&v| {
      if max == 0 {
        SPARK_LEVELS[0]
      } else {
        let level = (v * (SPARK_LEVELS.len() as u64 - 1) + max / 2) / max;
        SPARK_LEVELS[level as usize]
      }
    })
    .collect()
}

/// Comma-joined tags, `-` when there are none
pub fn join_or_dash(items: &[String]) -> String {
  if items.is_empty() {
    "-".to_string()
  } else {
    items.join(", ")
  }
}
