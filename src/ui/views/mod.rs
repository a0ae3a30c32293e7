mod dashboard;
mod university_detail;

pub use dashboard::{DashboardSettings, DashboardView};
pub use university_detail::UniversityDetailView;
