//! Reminder partitioning and status by date.

use crate::domain::entities::Reminder;
use chrono::NaiveDate;
use serde::Serialize;

/// Reminders split by completion, each side in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReminderPartition {
    pub upcoming: Vec<Reminder>,
    pub completed: Vec<Reminder>,
}

/// Splits reminders into open (`upcoming`) and done (`completed`). Stable.
pub fn partition_reminders(reminders: &[Reminder]) -> ReminderPartition {
    let (completed, upcoming): (Vec<Reminder>, Vec<Reminder>) =
        reminders.iter().cloned().partition(|r| r.is_completed);
    ReminderPartition {
        upcoming,
        completed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Completed,
    /// Open and dated before today.
    Overdue,
    /// Open and dated today.
    Due,
    Upcoming,
}

impl ReminderStatus {
    pub fn of(reminder: &Reminder, today: NaiveDate) -> Self {
        if reminder.is_completed {
            ReminderStatus::Completed
        } else if reminder.reminder_date < today {
            ReminderStatus::Overdue
        } else if reminder.reminder_date == today {
            ReminderStatus::Due
        } else {
            ReminderStatus::Upcoming
        }
    }
}

/// Open reminders dated before `today`, in input order.
pub fn overdue(reminders: &[Reminder], today: NaiveDate) -> Vec<Reminder> {
    reminders
        .iter()
        .filter(|r| ReminderStatus::of(r, today) == ReminderStatus::Overdue)
        .cloned()
        .collect()
}

/// Open reminders on or after `as_of`, ascending by date, at most `limit`.
///
/// Same selection `ReminderStore::list_upcoming` applies in the store.
pub fn select_upcoming(reminders: &[Reminder], as_of: NaiveDate, limit: usize) -> Vec<Reminder> {
    let mut open: Vec<Reminder> = reminders
        .iter()
        .filter(|r| !r.is_completed && r.reminder_date >= as_of)
        .cloned()
        .collect();
    open.sort_by(|a, b| {
        a.reminder_date
            .cmp(&b.reminder_date)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    open.truncate(limit);
    open
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ReminderType;
    use chrono::{TimeZone, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn reminder(id: &str, date: NaiveDate, done: bool) -> Reminder {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Reminder {
            id: id.to_string(),
            pregnancy_id: "p1".to_string(),
            reminder_date: date,
            reminder_type: ReminderType::Checkup,
            title: format!("reminder {}", id),
            description: None,
            location: None,
            is_completed: done,
            completed_at: done.then_some(created),
            created_at: created,
        }
    }

    #[test]
    fn test_partition_keeps_order_and_counts() {
        let input = vec![
            reminder("a", d(2024, 3, 1), false),
            reminder("b", d(2024, 2, 1), true),
            reminder("c", d(2024, 4, 1), false),
            reminder("d", d(2024, 1, 1), true),
            reminder("e", d(2024, 5, 1), false),
        ];
        let parts = partition_reminders(&input);
        assert_eq!(parts.upcoming.len() + parts.completed.len(), input.len());
        let up: Vec<&str> = parts.upcoming.iter().map(|r| r.id.as_str()).collect();
        let done: Vec<&str> = parts.completed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(up, ["a", "c", "e"]);
        assert_eq!(done, ["b", "d"]);
        assert!(parts.upcoming.iter().all(|r| !r.is_completed));
        assert!(parts.completed.iter().all(|r| r.is_completed));
    }

    #[test]
    fn test_partition_empty() {
        assert_eq!(partition_reminders(&[]), ReminderPartition::default());
    }

    #[test]
    fn test_status_by_date() {
        let today = d(2024, 3, 10);
        assert_eq!(
            ReminderStatus::of(&reminder("a", d(2024, 3, 9), false), today),
            ReminderStatus::Overdue
        );
        assert_eq!(
            ReminderStatus::of(&reminder("b", today, false), today),
            ReminderStatus::Due
        );
        assert_eq!(
            ReminderStatus::of(&reminder("c", d(2024, 3, 11), false), today),
            ReminderStatus::Upcoming
        );
        assert_eq!(
            ReminderStatus::of(&reminder("d", d(2024, 3, 1), true), today),
            ReminderStatus::Completed
        );
    }

    #[test]
    fn test_overdue_skips_completed() {
        let today = d(2024, 3, 10);
        let input = vec![
            reminder("a", d(2024, 3, 1), true),
            reminder("b", d(2024, 3, 2), false),
            reminder("c", d(2024, 3, 20), false),
        ];
        let ids: Vec<String> = overdue(&input, today).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["b"]);
    }

    #[test]
    fn test_select_upcoming_filters_sorts_and_caps() {
        let as_of = d(2024, 3, 10);
        let input = vec![
            reminder("late", d(2024, 6, 1), false),
            reminder("past", d(2024, 3, 9), false),
            reminder("done", d(2024, 3, 12), true),
            reminder("today", as_of, false),
            reminder("soon", d(2024, 3, 11), false),
        ];
        let ids: Vec<String> = select_upcoming(&input, as_of, 2)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["today", "soon"]);
    }
}
