//! Domain entities. Pure data structures for the core business.
//!
//! Field names match the backend's column names so records round-trip
//! through either store unchanged. Nullable columns are `Option` and are
//! omitted from serialized output when absent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One pregnancy episode for one user. At most one per user is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pregnancy {
    pub id: String,
    pub user_id: String,
    pub last_menstruation_date: NaiveDate,
    pub expected_due_date: NaiveDate,
    /// Overrides `expected_due_date` once dated by ultrasound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultrasound_due_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub profile: PregnancyProfile,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Demographic and lifestyle fields. Opaque to every calculation.
///
/// Unset fields serialize as `null`, so a patch carrying a profile replaces
/// the stored one whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PregnancyProfile {
    pub civil_status: Option<String>,
    pub education: Option<String>,
    pub occupation: Option<String>,
    pub workplace: Option<String>,
    pub country_background: Option<String>,
    pub language: Option<String>,
    pub interpreter_needed: bool,
    pub gp_name: Option<String>,
    pub gp_phone: Option<String>,
    pub midwife_name: Option<String>,
    pub midwife_phone: Option<String>,
    pub is_first_pregnancy: bool,
    pub previous_pregnancies_count: u32,
    pub previous_births_count: u32,
    pub diet_notes: Option<String>,
    pub takes_folic_acid: bool,
    pub physical_activity: Option<String>,
    pub smoking: bool,
    pub snus: bool,
    pub alcohol: bool,
    pub other_substances: Option<String>,
}

/// A routine prenatal checkup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkup {
    pub id: String,
    pub pregnancy_id: String,
    pub checkup_date: NaiveDate,
    /// Gestational age snapshot at the time of the checkup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gestational_weeks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gestational_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkup_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<String>,
    #[serde(flatten)]
    pub measurements: CheckupMeasurements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_appointment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Measurement group of a checkup. Like the profile, replaced whole by patches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckupMeasurements {
    pub weight_kg: Option<f64>,
    pub blood_pressure_systolic: Option<u32>,
    pub blood_pressure_diastolic: Option<u32>,
    pub symphysis_fundal_height_cm: Option<f64>,
    pub urine_protein: Option<String>,
    pub urine_glucose: Option<String>,
    pub urine_bacteria: Option<bool>,
    pub hemoglobin: Option<f64>,
    pub fetal_heartbeat: Option<bool>,
    pub fetal_heartbeat_rate: Option<u32>,
    pub fetal_movements: Option<String>,
}

/// An ultrasound examination with fetal biometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ultrasound {
    pub id: String,
    pub pregnancy_id: String,
    pub ultrasound_date: NaiveDate,
    pub gestational_weeks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gestational_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultrasound_type: Option<String>,
    #[serde(flatten)]
    pub biometry: FetalBiometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placenta_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placenta_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amniotic_fluid_level: Option<String>,
    #[serde(default = "default_fetus_count")]
    pub number_of_fetuses: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings: Option<String>,
    /// Advisory only; nothing reacts to it.
    #[serde(default)]
    pub anomalies_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nipt_consent_given: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetalBiometry {
    pub crown_rump_length_mm: Option<f64>,
    pub biparietal_diameter_mm: Option<f64>,
    pub head_circumference_mm: Option<f64>,
    pub abdominal_circumference_mm: Option<f64>,
    pub femur_length_mm: Option<f64>,
    pub estimated_fetal_weight_g: Option<f64>,
    pub nuchal_translucency_mm: Option<f64>,
}

/// A blood test and its lab results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodTest {
    pub id: String,
    pub pregnancy_id: String,
    pub test_date: NaiveDate,
    pub test_type: String,
    #[serde(flatten)]
    pub results: BloodTestResults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloodTestResults {
    pub blood_type: Option<String>,
    pub hemoglobin_value: Option<f64>,
    pub antibodies_detected: Option<bool>,
    pub antibody_details: Option<String>,
    pub rubella_immune: Option<bool>,
    pub hepatitis_b: Option<String>,
    pub hiv: Option<String>,
    pub syphilis: Option<String>,
    pub test_result: Option<String>,
}

/// A dated, completable to-do item.
///
/// `completed_at` is `Some` exactly when `is_completed` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub pregnancy_id: String,
    pub reminder_date: NaiveDate,
    pub reminder_type: ReminderType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Reminder category. Known labels are parsed in English or Norwegian;
/// anything else is kept verbatim in `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReminderType {
    Checkup,
    Ultrasound,
    BloodTest,
    Other,
    Custom(String),
}

impl ReminderType {
    /// Stored label, as written by the existing frontend.
    pub fn label(&self) -> &str {
        match self {
            ReminderType::Checkup => "Kontroll",
            ReminderType::Ultrasound => "Ultralyd",
            ReminderType::BloodTest => "Blodprøve",
            ReminderType::Other => "Annet",
            ReminderType::Custom(s) => s,
        }
    }
}

impl From<String> for ReminderType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "kontroll" | "checkup" => ReminderType::Checkup,
            "ultralyd" | "ultrasound" => ReminderType::Ultrasound,
            "blodprøve" | "blood test" | "bloodtest" => ReminderType::BloodTest,
            "annet" | "other" => ReminderType::Other,
            _ => ReminderType::Custom(s),
        }
    }
}

impl From<&str> for ReminderType {
    fn from(s: &str) -> Self {
        ReminderType::from(s.to_string())
    }
}

impl From<ReminderType> for String {
    fn from(t: ReminderType) -> Self {
        match t {
            ReminderType::Custom(s) => s,
            other => other.label().to_string(),
        }
    }
}

impl fmt::Display for ReminderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn default_true() -> bool {
    true
}

fn default_fetus_count() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_type_parses_both_languages() {
        assert_eq!(ReminderType::from("Kontroll"), ReminderType::Checkup);
        assert_eq!(ReminderType::from("checkup"), ReminderType::Checkup);
        assert_eq!(ReminderType::from("Blood test"), ReminderType::BloodTest);
        assert_eq!(ReminderType::from("Blodprøve"), ReminderType::BloodTest);
        assert_eq!(ReminderType::from("Annet"), ReminderType::Other);
        assert_eq!(
            ReminderType::from("Vaksine"),
            ReminderType::Custom("Vaksine".to_string())
        );
    }

    #[test]
    fn test_reminder_type_serializes_as_label() {
        let json = serde_json::to_string(&ReminderType::Ultrasound).unwrap();
        assert_eq!(json, "\"Ultralyd\"");
        let custom: ReminderType = serde_json::from_str("\"Tannlege\"").unwrap();
        assert_eq!(serde_json::to_string(&custom).unwrap(), "\"Tannlege\"");
    }

    #[test]
    fn test_reminder_defaults_to_open() {
        let json = r#"{
            "id": "r1",
            "pregnancy_id": "p1",
            "reminder_date": "2024-05-01",
            "reminder_type": "Kontroll",
            "title": "Midwife",
            "created_at": "2024-04-01T10:00:00Z"
        }"#;
        let r: Reminder = serde_json::from_str(json).unwrap();
        assert!(!r.is_completed);
        assert!(r.completed_at.is_none());
    }

    #[test]
    fn test_checkup_reads_backend_nulls() {
        let json = r#"{
            "id": "c1",
            "pregnancy_id": "p1",
            "checkup_date": "2024-02-01",
            "gestational_weeks": null,
            "weight_kg": 64.5,
            "blood_pressure_systolic": null,
            "notes": null,
            "created_at": "2024-02-01T09:00:00Z",
            "updated_at": "2024-02-01T09:00:00Z"
        }"#;
        let c: Checkup = serde_json::from_str(json).unwrap();
        assert_eq!(c.measurements.weight_kg, Some(64.5));
        assert_eq!(c.measurements.blood_pressure_systolic, None);
        assert_eq!(c.gestational_weeks, None);
    }
}
