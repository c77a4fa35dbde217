//! Create inputs (drafts) and partial updates (patches) for each entity.
//!
//! Drafts carry what a caller supplies; stores add `id` and timestamps.
//! Patches serialize only the fields that are set, so merging a patch into a
//! record's JSON overwrites exactly those columns. Nullable columns are
//! `Option<Option<T>>` in patches: `Some(None)` serializes as `null` and
//! clears the column. Flattened groups (profile, measurements, biometry,
//! lab results) are replaced whole when set.

use crate::domain::entities::{
    BloodTestResults, CheckupMeasurements, FetalBiometry, PregnancyProfile, ReminderType,
};
use crate::domain::errors::DomainError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Input check run by every store before touching the backend.
pub trait Validate {
    fn validate(&self) -> Result<(), DomainError>;
}

fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn check_gestational_days(days: Option<u32>) -> Result<(), DomainError> {
    match days {
        Some(d) if d > 6 => Err(DomainError::Validation(format!(
            "gestational_days must be within 0..=6, got {}",
            d
        ))),
        _ => Ok(()),
    }
}

/// Shared by `NewPregnancy` and the merged record after an update.
pub(crate) fn check_due_after_lmp(lmp: NaiveDate, due: NaiveDate) -> Result<(), DomainError> {
    if due <= lmp {
        return Err(DomainError::Validation(format!(
            "expected_due_date {} must be after last_menstruation_date {}",
            due, lmp
        )));
    }
    Ok(())
}

fn check_positive(field: &str, value: Option<f64>) -> Result<(), DomainError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(DomainError::Validation(format!(
            "{} must be a positive number, got {}",
            field, v
        ))),
        _ => Ok(()),
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Pregnancy
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPregnancy {
    pub user_id: String,
    pub last_menstruation_date: Option<NaiveDate>,
    /// Filled from the LMP by `PregnancyService::start_pregnancy` when absent.
    pub expected_due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultrasound_due_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub profile: PregnancyProfile,
    pub is_active: bool,
}

impl NewPregnancy {
    /// A new active pregnancy with an empty profile.
    pub fn new(user_id: impl Into<String>, last_menstruation_date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            last_menstruation_date: Some(last_menstruation_date),
            is_active: true,
            ..Default::default()
        }
    }
}

impl Validate for NewPregnancy {
    fn validate(&self) -> Result<(), DomainError> {
        require_text("user_id", &self.user_id)?;
        let lmp = self.last_menstruation_date.ok_or_else(|| {
            DomainError::Validation("last_menstruation_date is required".into())
        })?;
        let due = self
            .expected_due_date
            .ok_or_else(|| DomainError::Validation("expected_due_date is required".into()))?;
        check_due_after_lmp(lmp, due)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PregnancyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_menstruation_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultrasound_due_date: Option<Option<NaiveDate>>,
    /// Replaces the whole profile when set; its unset fields are cleared.
    #[serde(flatten)]
    pub profile: Option<PregnancyProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Validate for PregnancyPatch {
    fn validate(&self) -> Result<(), DomainError> {
        if let (Some(lmp), Some(due)) = (self.last_menstruation_date, self.expected_due_date) {
            check_due_after_lmp(lmp, due)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Checkup
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCheckup {
    pub pregnancy_id: String,
    pub checkup_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gestational_weeks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gestational_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkup_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<String>,
    #[serde(flatten)]
    pub measurements: CheckupMeasurements,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_appointment_date: Option<NaiveDate>,
}

impl NewCheckup {
    pub fn new(pregnancy_id: impl Into<String>, checkup_date: NaiveDate) -> Self {
        Self {
            pregnancy_id: pregnancy_id.into(),
            checkup_date,
            gestational_weeks: None,
            gestational_days: None,
            checkup_type: None,
            location: None,
            performed_by: None,
            measurements: CheckupMeasurements::default(),
            notes: None,
            next_appointment_date: None,
        }
    }
}

pub(crate) fn check_measurements(m: &CheckupMeasurements) -> Result<(), DomainError> {
    check_positive("weight_kg", m.weight_kg)?;
    check_positive("symphysis_fundal_height_cm", m.symphysis_fundal_height_cm)?;
    check_positive("hemoglobin", m.hemoglobin)?;
    if let (Some(sys), Some(dia)) = (m.blood_pressure_systolic, m.blood_pressure_diastolic) {
        if sys <= dia {
            return Err(DomainError::Validation(format!(
                "blood pressure systolic {} must exceed diastolic {}",
                sys, dia
            )));
        }
    }
    Ok(())
}

impl Validate for NewCheckup {
    fn validate(&self) -> Result<(), DomainError> {
        require_text("pregnancy_id", &self.pregnancy_id)?;
        check_gestational_days(self.gestational_days)?;
        check_measurements(&self.measurements)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckupPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkup_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gestational_weeks: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gestational_days: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkup_type: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<Option<String>>,
    /// Replaces every measurement when set.
    #[serde(flatten)]
    pub measurements: Option<CheckupMeasurements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_appointment_date: Option<Option<NaiveDate>>,
}

impl Validate for CheckupPatch {
    fn validate(&self) -> Result<(), DomainError> {
        check_gestational_days(self.gestational_days.flatten())?;
        match &self.measurements {
            Some(m) => check_measurements(m),
            None => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Ultrasound
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUltrasound {
    pub pregnancy_id: String,
    pub ultrasound_date: NaiveDate,
    pub gestational_weeks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gestational_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultrasound_type: Option<String>,
    #[serde(flatten)]
    pub biometry: FetalBiometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placenta_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placenta_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amniotic_fluid_level: Option<String>,
    pub number_of_fetuses: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<String>,
    pub anomalies_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nipt_consent_given: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl NewUltrasound {
    pub fn new(
        pregnancy_id: impl Into<String>,
        ultrasound_date: NaiveDate,
        gestational_weeks: u32,
    ) -> Self {
        Self {
            pregnancy_id: pregnancy_id.into(),
            ultrasound_date,
            gestational_weeks,
            gestational_days: None,
            ultrasound_type: None,
            biometry: FetalBiometry::default(),
            placenta_location: None,
            placenta_notes: None,
            amniotic_fluid_level: None,
            number_of_fetuses: 1,
            findings: None,
            anomalies_detected: false,
            nipt_consent_given: None,
            performed_by: None,
            location: None,
        }
    }
}

impl Validate for NewUltrasound {
    fn validate(&self) -> Result<(), DomainError> {
        require_text("pregnancy_id", &self.pregnancy_id)?;
        check_gestational_days(self.gestational_days)?;
        if self.number_of_fetuses == 0 {
            return Err(DomainError::Validation(
                "number_of_fetuses must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UltrasoundPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultrasound_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gestational_weeks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gestational_days: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultrasound_type: Option<Option<String>>,
    /// Replaces every biometry value when set.
    #[serde(flatten)]
    pub biometry: Option<FetalBiometry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placenta_location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placenta_notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amniotic_fluid_level: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_fetuses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomalies_detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nipt_consent_given: Option<Option<bool>>,
}

impl Validate for UltrasoundPatch {
    fn validate(&self) -> Result<(), DomainError> {
        check_gestational_days(self.gestational_days.flatten())?;
        if self.number_of_fetuses == Some(0) {
            return Err(DomainError::Validation(
                "number_of_fetuses must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Blood test
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBloodTest {
    pub pregnancy_id: String,
    pub test_date: NaiveDate,
    pub test_type: String,
    #[serde(flatten)]
    pub results: BloodTestResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewBloodTest {
    pub fn new(
        pregnancy_id: impl Into<String>,
        test_date: NaiveDate,
        test_type: impl Into<String>,
    ) -> Self {
        Self {
            pregnancy_id: pregnancy_id.into(),
            test_date,
            test_type: test_type.into(),
            results: BloodTestResults::default(),
            notes: None,
        }
    }
}

impl Validate for NewBloodTest {
    fn validate(&self) -> Result<(), DomainError> {
        require_text("pregnancy_id", &self.pregnancy_id)?;
        require_text("test_type", &self.test_type)?;
        check_positive("hemoglobin_value", self.results.hemoglobin_value)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BloodTestPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    /// Replaces every lab result when set.
    #[serde(flatten)]
    pub results: Option<BloodTestResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl Validate for BloodTestPatch {
    fn validate(&self) -> Result<(), DomainError> {
        if let Some(t) = &self.test_type {
            require_text("test_type", t)?;
        }
        check_positive(
            "hemoglobin_value",
            self.results.as_ref().and_then(|r| r.hemoglobin_value),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Reminder
// ─────────────────────────────────────────────────────────────────────────

/// New reminders always start open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    pub pregnancy_id: String,
    pub reminder_date: NaiveDate,
    pub reminder_type: ReminderType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl NewReminder {
    pub fn new(
        pregnancy_id: impl Into<String>,
        reminder_date: NaiveDate,
        reminder_type: ReminderType,
        title: impl Into<String>,
    ) -> Self {
        Self {
            pregnancy_id: pregnancy_id.into(),
            reminder_date,
            reminder_type,
            title: title.into(),
            description: None,
            location: None,
        }
    }
}

impl Validate for NewReminder {
    fn validate(&self) -> Result<(), DomainError> {
        require_text("pregnancy_id", &self.pregnancy_id)?;
        require_text("title", &self.title)?;
        if let ReminderType::Custom(label) = &self.reminder_type {
            require_text("reminder_type", label)?;
        }
        Ok(())
    }
}

/// Partial reminder update. Completion fields can only be set together,
/// through [`ReminderPatch::completed`] or [`ReminderPatch::reopened`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReminderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_type: Option<ReminderType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_completed: Option<bool>,
    /// `Some(None)` serializes as `null` and clears the column.
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<Option<DateTime<Utc>>>,
}

impl ReminderPatch {
    /// Marks the reminder done at `at`.
    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            is_completed: Some(true),
            completed_at: Some(Some(at)),
            ..Default::default()
        }
    }

    /// Marks the reminder open again and clears the completion time.
    pub fn reopened() -> Self {
        Self {
            is_completed: Some(false),
            completed_at: Some(None),
            ..Default::default()
        }
    }

    /// Whether this patch changes completion state.
    pub fn completion(&self) -> Option<bool> {
        self.is_completed
    }
}

impl Validate for ReminderPatch {
    fn validate(&self) -> Result<(), DomainError> {
        if let Some(t) = &self.title {
            require_text("title", t)?;
        }
        match (self.is_completed, self.completed_at) {
            (None, None) | (Some(true), Some(Some(_))) | (Some(false), Some(None)) => Ok(()),
            _ => Err(DomainError::Validation(
                "is_completed and completed_at must change together".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_new_pregnancy_requires_due_date() {
        let draft = NewPregnancy::new("u1", d(2024, 1, 1));
        let err = draft.validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("expected_due_date")));
    }

    #[test]
    fn test_new_pregnancy_requires_lmp() {
        let draft = NewPregnancy {
            user_id: "u1".into(),
            expected_due_date: Some(d(2024, 10, 7)),
            ..Default::default()
        };
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_new_reminder_rejects_blank_title() {
        let draft = NewReminder::new("p1", d(2024, 5, 1), ReminderType::Checkup, "  ");
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_checkup_rejects_inverted_blood_pressure() {
        let mut draft = NewCheckup::new("p1", d(2024, 3, 1));
        draft.measurements.blood_pressure_systolic = Some(70);
        draft.measurements.blood_pressure_diastolic = Some(120);
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_checkup_rejects_day_out_of_week() {
        let mut draft = NewCheckup::new("p1", d(2024, 3, 1));
        draft.gestational_weeks = Some(9);
        draft.gestational_days = Some(7);
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_reminder_patch_completion_sets_both_fields() {
        let at = d(2024, 5, 1).and_hms_opt(8, 0, 0).unwrap().and_utc();
        let json = serde_json::to_value(ReminderPatch::completed(at)).unwrap();
        assert_eq!(json["is_completed"], true);
        assert_eq!(json["completed_at"], "2024-05-01T08:00:00Z");
        assert!(ReminderPatch::completed(at).validate().is_ok());
    }

    #[test]
    fn test_reminder_patch_reopen_serializes_null() {
        let json = serde_json::to_value(ReminderPatch::reopened()).unwrap();
        assert_eq!(json["is_completed"], false);
        assert!(json["completed_at"].is_null());
        assert!(json.as_object().unwrap().contains_key("completed_at"));
    }

    #[test]
    fn test_reminder_patch_rejects_half_completion() {
        let patch = ReminderPatch {
            is_completed: Some(true),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = CheckupPatch {
            notes: Some(Some("ok".into())),
            location: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(patch).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["notes"], "ok");
        assert!(obj["location"].is_null());
    }

    #[test]
    fn test_patch_measurement_group_serializes_in_full() {
        let patch = CheckupPatch {
            measurements: Some(CheckupMeasurements {
                weight_kg: Some(70.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(patch).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 11);
        assert_eq!(obj["weight_kg"], 70.0);
        assert!(obj["blood_pressure_systolic"].is_null());
    }

    #[test]
    fn test_pregnancy_patch_profile_nulls_unset_fields() {
        let patch = PregnancyPatch {
            profile: Some(PregnancyProfile::default()),
            ..Default::default()
        };
        let json = serde_json::to_value(patch).unwrap();
        assert!(json["civil_status"].is_null());
        assert!(json.as_object().unwrap().contains_key("civil_status"));
        assert_eq!(json["smoking"], false);
    }
}
