//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters (SQLite, in-memory, hosted REST backend).

use crate::domain::{DomainError, ListOrder, Pregnancy, Record, Reminder};
use chrono::NaiveDate;

/// Generic record repository. One implementation serves every entity type.
#[async_trait::async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Fetch one record by id. `Ok(None)` when no row matches.
    async fn get(&self, id: &str) -> Result<Option<R>, DomainError>;

    /// All records belonging to `parent_id`, sorted by `order`.
    /// Each call re-reads the store.
    async fn list(&self, parent_id: &str, order: ListOrder) -> Result<Vec<R>, DomainError>;

    /// Validate and insert a new record; the store assigns `id` and timestamps.
    ///
    /// # Errors
    /// `Validation` for missing or malformed input, `Storage` otherwise.
    async fn create(&self, draft: &R::Draft) -> Result<R, DomainError>;

    /// Merge the patch's set fields into the record and return the result.
    ///
    /// # Errors
    /// `NotFound` when `id` does not exist, `Validation` for a bad patch,
    /// `Storage` otherwise.
    async fn update(&self, id: &str, patch: &R::Patch) -> Result<R, DomainError>;
}

/// Pregnancy repository. `list` takes the owner's user id as the parent.
#[async_trait::async_trait]
pub trait PregnancyStore: RecordStore<Pregnancy> {
    /// The owner's single active pregnancy. "No rows" is `Ok(None)`, not an error.
    async fn get_active(&self, owner_id: &str) -> Result<Option<Pregnancy>, DomainError>;
}

/// Reminder repository with the dashboard's bounded "next up" query.
#[async_trait::async_trait]
pub trait ReminderStore: RecordStore<Reminder> {
    /// Open reminders dated on or after `as_of`, ascending by date, at most `limit`.
    async fn list_upcoming(
        &self,
        pregnancy_id: &str,
        as_of: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Reminder>, DomainError>;
}
