//! Port traits. API boundaries for the hexagon.
//!
//! - Outbound: record stores called by the application, implemented by adapters
//! - Clock: injected source of "now"

pub mod clock;
pub mod outbound;

pub use clock::Clock;
pub use outbound::{PregnancyStore, RecordStore, ReminderStore};
