//! Application use cases. Orchestrate domain logic via ports.

pub mod dashboard_service;
pub mod journal_service;
pub mod pregnancy_service;
pub mod reminder_service;
pub mod trend_service;

pub use dashboard_service::{DashboardOverview, DashboardService};
pub use journal_service::JournalService;
pub use pregnancy_service::PregnancyService;
pub use reminder_service::ReminderService;
pub use trend_service::TrendService;
