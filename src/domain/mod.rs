//! Core domain layer. No external I/O dependencies.
//!
//! Entities, timeline arithmetic and reminder rules live here. Dependencies flow inward.

pub mod drafts;
pub mod entities;
pub mod errors;
pub mod record;
pub mod reminders;
pub mod timeline;
pub mod trends;

pub use drafts::{
    BloodTestPatch, CheckupPatch, NewBloodTest, NewCheckup, NewPregnancy, NewReminder,
    NewUltrasound, PregnancyPatch, ReminderPatch, UltrasoundPatch, Validate,
};
pub use entities::{
    BloodTest, BloodTestResults, Checkup, CheckupMeasurements, FetalBiometry, Pregnancy,
    PregnancyProfile, Reminder, ReminderType, Ultrasound,
};
pub use errors::DomainError;
pub use record::{ListOrder, OrderBy, Record, SortDirection};
pub use reminders::{ReminderPartition, ReminderStatus, partition_reminders};
pub use timeline::{GestationalAge, gestational_age, gestational_age_checked};
pub use trends::{BloodPressurePoint, TrendSeries, WeightPoint, WeightSummary};
