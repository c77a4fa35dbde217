//! Persistable record trait and the JSON-level helpers every store shares.
//!
//! Stores keep each record as its JSON representation. Creating stamps a
//! draft with `id` and timestamps; updating overlays the patch's set fields
//! on the stored JSON and re-reads it through the typed record.

use crate::domain::drafts::{
    BloodTestPatch, CheckupPatch, NewBloodTest, NewCheckup, NewPregnancy, NewReminder,
    NewUltrasound, PregnancyPatch, ReminderPatch, UltrasoundPatch, Validate,
    check_due_after_lmp, check_measurements,
};
use crate::domain::entities::{BloodTest, Checkup, Pregnancy, Reminder, Ultrasound};
use crate::domain::errors::DomainError;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    /// The entity's own date column (`checkup_date`, `reminder_date`, ...).
    RecordDate,
    CreatedAt,
}

/// Sort order for `RecordStore::list`. Ties fall back to `created_at`, then `id`,
/// in the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOrder {
    pub by: OrderBy,
    pub direction: SortDirection,
}

impl ListOrder {
    pub fn by_date(direction: SortDirection) -> Self {
        Self {
            by: OrderBy::RecordDate,
            direction,
        }
    }

    /// The order the frontend lists this entity in.
    pub fn default_for<R: Record>() -> Self {
        Self::by_date(R::DEFAULT_DIRECTION)
    }

    /// Column name in the backend schema.
    pub fn column<R: Record>(&self) -> &'static str {
        match self.by {
            OrderBy::RecordDate => R::DATE_COLUMN,
            OrderBy::CreatedAt => "created_at",
        }
    }
}

/// A record kept in one backend table, owned by one parent row.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Draft: Serialize + Validate + Send + Sync;
    type Patch: Serialize + Validate + Send + Sync;

    /// Human-readable entity name for errors and logs.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    /// Foreign key to the owning row (`user_id` for pregnancies).
    const PARENT_COLUMN: &'static str;
    const DATE_COLUMN: &'static str;
    const DEFAULT_DIRECTION: SortDirection;
    /// Boolean column the store filters on, if any.
    const FLAG_COLUMN: Option<&'static str> = None;
    /// At most one row per parent may have the flag set.
    const EXCLUSIVE_FLAG: bool = false;
    const HAS_UPDATED_AT: bool = false;

    fn id(&self) -> &str;
    fn parent_id(&self) -> &str;
    fn record_date(&self) -> NaiveDate;
    fn created_at(&self) -> DateTime<Utc>;
    fn flag(&self) -> bool {
        false
    }
    /// Cross-field rules on the whole record, run after every create and merge.
    fn check(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

impl Record for Pregnancy {
    type Draft = NewPregnancy;
    type Patch = PregnancyPatch;
    const ENTITY: &'static str = "pregnancy";
    const TABLE: &'static str = "pregnancies";
    const PARENT_COLUMN: &'static str = "user_id";
    const DATE_COLUMN: &'static str = "last_menstruation_date";
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Ascending;
    const FLAG_COLUMN: Option<&'static str> = Some("is_active");
    const EXCLUSIVE_FLAG: bool = true;
    const HAS_UPDATED_AT: bool = true;

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> &str {
        &self.user_id
    }
    fn record_date(&self) -> NaiveDate {
        self.last_menstruation_date
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn flag(&self) -> bool {
        self.is_active
    }
    fn check(&self) -> Result<(), DomainError> {
        check_due_after_lmp(self.last_menstruation_date, self.expected_due_date)
    }
}

impl Record for Checkup {
    type Draft = NewCheckup;
    type Patch = CheckupPatch;
    const ENTITY: &'static str = "checkup";
    const TABLE: &'static str = "checkups";
    const PARENT_COLUMN: &'static str = "pregnancy_id";
    const DATE_COLUMN: &'static str = "checkup_date";
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Descending;
    const HAS_UPDATED_AT: bool = true;

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> &str {
        &self.pregnancy_id
    }
    fn record_date(&self) -> NaiveDate {
        self.checkup_date
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn check(&self) -> Result<(), DomainError> {
        check_measurements(&self.measurements)
    }
}

impl Record for Ultrasound {
    type Draft = NewUltrasound;
    type Patch = UltrasoundPatch;
    const ENTITY: &'static str = "ultrasound";
    const TABLE: &'static str = "ultrasounds";
    const PARENT_COLUMN: &'static str = "pregnancy_id";
    const DATE_COLUMN: &'static str = "ultrasound_date";
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Descending;

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> &str {
        &self.pregnancy_id
    }
    fn record_date(&self) -> NaiveDate {
        self.ultrasound_date
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for BloodTest {
    type Draft = NewBloodTest;
    type Patch = BloodTestPatch;
    const ENTITY: &'static str = "blood test";
    const TABLE: &'static str = "blood_tests";
    const PARENT_COLUMN: &'static str = "pregnancy_id";
    const DATE_COLUMN: &'static str = "test_date";
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Descending;

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> &str {
        &self.pregnancy_id
    }
    fn record_date(&self) -> NaiveDate {
        self.test_date
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for Reminder {
    type Draft = NewReminder;
    type Patch = ReminderPatch;
    const ENTITY: &'static str = "reminder";
    const TABLE: &'static str = "reminders";
    const PARENT_COLUMN: &'static str = "pregnancy_id";
    const DATE_COLUMN: &'static str = "reminder_date";
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Ascending;
    const FLAG_COLUMN: Option<&'static str> = Some("is_completed");

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> &str {
        &self.pregnancy_id
    }
    fn record_date(&self) -> NaiveDate {
        self.reminder_date
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn flag(&self) -> bool {
        self.is_completed
    }
}

/// Timestamp text with fixed precision, so it sorts lexicographically.
pub fn timestamp_key(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_object<T: Serialize>(entity: &str, value: &T) -> Result<Map<String, Value>, DomainError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DomainError::Validation(format!(
            "{} input must serialize to an object",
            entity
        ))),
        Err(e) => Err(DomainError::Validation(format!("{}: {}", entity, e))),
    }
}

fn from_object<R: Record>(map: Map<String, Value>) -> Result<R, DomainError> {
    serde_json::from_value(Value::Object(map))
        .map_err(|e| DomainError::Validation(format!("{}: {}", R::ENTITY, e)))
}

/// Validates `draft` and turns it into a full record with the given id and timestamps.
pub fn stamp_new<R: Record>(
    draft: &R::Draft,
    id: &str,
    now: DateTime<Utc>,
) -> Result<R, DomainError> {
    draft.validate()?;
    let mut map = to_object(R::ENTITY, draft)?;
    let ts = Value::String(timestamp_key(now));
    map.insert("id".into(), Value::String(id.to_string()));
    map.insert("created_at".into(), ts.clone());
    if R::HAS_UPDATED_AT {
        map.insert("updated_at".into(), ts);
    }
    let record: R = from_object(map)?;
    record.check()?;
    Ok(record)
}

/// Validates `patch`, merges its set fields into `current` and checks the
/// merged record. Identity, parent and `created_at` are never overwritten.
pub fn apply_patch<R: Record>(
    current: &R,
    patch: &R::Patch,
    now: DateTime<Utc>,
) -> Result<R, DomainError> {
    patch.validate()?;
    let mut map = to_object(R::ENTITY, current)?;
    for (key, value) in to_object(R::ENTITY, patch)? {
        if key == "id" || key == "created_at" || key == R::PARENT_COLUMN {
            continue;
        }
        map.insert(key, value);
    }
    if R::HAS_UPDATED_AT {
        map.insert("updated_at".into(), Value::String(timestamp_key(now)));
    }
    let merged: R = from_object(map)?;
    merged.check()?;
    Ok(merged)
}

/// Clears `FLAG_COLUMN` on a stored record, used to demote siblings of an
/// exclusively flagged record.
pub fn clear_flag<R: Record>(current: &R, now: DateTime<Utc>) -> Result<R, DomainError> {
    let Some(column) = R::FLAG_COLUMN else {
        return Ok(current.clone());
    };
    let mut map = to_object(R::ENTITY, current)?;
    map.insert(column.into(), Value::Bool(false));
    if R::HAS_UPDATED_AT {
        map.insert("updated_at".into(), Value::String(timestamp_key(now)));
    }
    from_object(map)
}

/// Orders records in memory the way stores order rows.
pub fn sort_records<R: Record>(records: &mut [R], order: ListOrder) {
    records.sort_by(|a, b| {
        let primary = match order.by {
            OrderBy::RecordDate => a.record_date().cmp(&b.record_date()),
            OrderBy::CreatedAt => a.created_at().cmp(&b.created_at()),
        };
        primary
            .then_with(|| a.created_at().cmp(&b.created_at()))
            .then_with(|| a.id().cmp(b.id()))
    });
    if order.direction == SortDirection::Descending {
        records.reverse();
    }
}
