pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{
  format_date, format_growth, format_last_sync, format_timestamp, group_thousands, join_or_dash,
  outcome_color, outcome_label, sparkline, truncate, GrowthClass,
};
