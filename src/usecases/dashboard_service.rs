//! Dashboard overview: where the active pregnancy stands today.

use crate::domain::timeline::{days_until, effective_due_date};
use crate::domain::{DomainError, GestationalAge, Pregnancy, Reminder, gestational_age_checked};
use crate::ports::{Clock, PregnancyStore, ReminderStore};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardOverview {
    pub pregnancy: Pregnancy,
    pub age: GestationalAge,
    /// Ultrasound-dated due date when known, otherwise the LMP estimate.
    pub due_date: NaiveDate,
    /// Negative once the due date has passed.
    pub days_until_due: i64,
    pub trimester: u8,
    pub upcoming: Vec<Reminder>,
}

pub struct DashboardService {
    pregnancies: Arc<dyn PregnancyStore>,
    reminders: Arc<dyn ReminderStore>,
    clock: Arc<dyn Clock>,
    upcoming_limit: usize,
}

impl DashboardService {
    pub fn new(
        pregnancies: Arc<dyn PregnancyStore>,
        reminders: Arc<dyn ReminderStore>,
        clock: Arc<dyn Clock>,
        upcoming_limit: usize,
    ) -> Self {
        Self {
            pregnancies,
            reminders,
            clock,
            upcoming_limit,
        }
    }

    /// `None` when the owner has no active pregnancy.
    ///
    /// # Errors
    /// `InvalidDateRange` when the stored LMP lies after today.
    pub async fn overview(&self, owner_id: &str) -> Result<Option<DashboardOverview>, DomainError> {
        let Some(pregnancy) = self.pregnancies.get_active(owner_id).await? else {
            debug!(owner_id, "no active pregnancy");
            return Ok(None);
        };
        let now = self.clock.now();
        let today = now.date_naive();
        let age = gestational_age_checked(pregnancy.last_menstruation_date, now)?;
        let due_date = effective_due_date(&pregnancy);
        let upcoming = self
            .reminders
            .list_upcoming(&pregnancy.id, today, self.upcoming_limit)
            .await?;
        Ok(Some(DashboardOverview {
            age,
            due_date,
            days_until_due: days_until(due_date, today),
            trimester: age.trimester(),
            upcoming,
            pregnancy,
        }))
    }
}
