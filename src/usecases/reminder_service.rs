//! Reminders: listing, the dashboard's "next up" slice, and the completion toggle.

use crate::domain::reminders::overdue;
use crate::domain::{
    DomainError, ListOrder, NewReminder, Record, Reminder, ReminderPartition, ReminderPatch,
    partition_reminders,
};
use crate::ports::{Clock, RecordStore, ReminderStore};
use std::sync::Arc;
use tracing::info;

/// Default size of the upcoming-reminders slice.
pub const DEFAULT_UPCOMING_LIMIT: usize = 5;

pub struct ReminderService {
    store: Arc<dyn ReminderStore>,
    clock: Arc<dyn Clock>,
    upcoming_limit: usize,
}

impl ReminderService {
    pub fn new(store: Arc<dyn ReminderStore>, clock: Arc<dyn Clock>, upcoming_limit: usize) -> Self {
        Self {
            store,
            clock,
            upcoming_limit,
        }
    }

    /// All reminders of a pregnancy, oldest first.
    pub async fn list(&self, pregnancy_id: &str) -> Result<Vec<Reminder>, DomainError> {
        self.store
            .list(pregnancy_id, ListOrder::default_for::<Reminder>())
            .await
    }

    /// Open reminders from today on, soonest first, capped at the configured limit.
    pub async fn list_upcoming(&self, pregnancy_id: &str) -> Result<Vec<Reminder>, DomainError> {
        self.store
            .list_upcoming(pregnancy_id, self.clock.today(), self.upcoming_limit)
            .await
    }

    /// All reminders split into open and completed, each side oldest first.
    pub async fn partitioned(&self, pregnancy_id: &str) -> Result<ReminderPartition, DomainError> {
        let all = self.list(pregnancy_id).await?;
        Ok(partition_reminders(&all))
    }

    /// Open reminders dated before today.
    pub async fn overdue(&self, pregnancy_id: &str) -> Result<Vec<Reminder>, DomainError> {
        let all = self.list(pregnancy_id).await?;
        Ok(overdue(&all, self.clock.today()))
    }

    pub async fn create(&self, draft: &NewReminder) -> Result<Reminder, DomainError> {
        let reminder = self.store.create(draft).await?;
        info!(
            pregnancy_id = %reminder.pregnancy_id,
            reminder_id = %reminder.id,
            date = %reminder.reminder_date,
            "created reminder"
        );
        Ok(reminder)
    }

    pub async fn update(&self, id: &str, patch: &ReminderPatch) -> Result<Reminder, DomainError> {
        self.store.update(id, patch).await
    }

    async fn existing(&self, id: &str) -> Result<Reminder, DomainError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(Reminder::ENTITY, id))
    }

    /// Marks a reminder done now. Completing an already-completed reminder
    /// returns it unchanged, keeping its original `completed_at`.
    ///
    /// # Errors
    /// `NotFound` when no reminder has this id.
    pub async fn complete_reminder(&self, id: &str) -> Result<Reminder, DomainError> {
        let current = self.existing(id).await?;
        if current.is_completed {
            return Ok(current);
        }
        let done = self
            .store
            .update(id, &ReminderPatch::completed(self.clock.now()))
            .await?;
        info!(reminder_id = %done.id, "completed reminder");
        Ok(done)
    }

    /// Marks a reminder open again, clearing `completed_at`. No-op on open reminders.
    pub async fn reopen_reminder(&self, id: &str) -> Result<Reminder, DomainError> {
        let current = self.existing(id).await?;
        if !current.is_completed {
            return Ok(current);
        }
        let open = self.store.update(id, &ReminderPatch::reopened()).await?;
        info!(reminder_id = %open.id, "reopened reminder");
        Ok(open)
    }
}
