//! Chart series derived from checkups: weight and blood pressure over time.

use crate::domain::entities::Checkup;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightPoint {
    pub date: NaiveDate,
    /// Snapshot week from the checkup, 0 when it was not recorded.
    pub week: u32,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloodPressurePoint {
    pub date: NaiveDate,
    pub week: u32,
    pub systolic: u32,
    pub diastolic: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSeries {
    pub weight: Vec<WeightPoint>,
    pub blood_pressure: Vec<BloodPressurePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightSummary {
    pub first_kg: f64,
    pub last_kg: f64,
    pub min_kg: f64,
    pub max_kg: f64,
    /// `last_kg - first_kg`.
    pub change_kg: f64,
}

/// Builds both series, oldest checkup first. Checkups missing the relevant
/// measurement are left out of that series only.
pub fn build_trends(checkups: &[Checkup]) -> TrendSeries {
    let mut sorted: Vec<&Checkup> = checkups.iter().collect();
    sorted.sort_by(|a, b| a.checkup_date.cmp(&b.checkup_date));

    let weight = sorted
        .iter()
        .filter_map(|c| {
            c.measurements.weight_kg.map(|kg| WeightPoint {
                date: c.checkup_date,
                week: c.gestational_weeks.unwrap_or(0),
                weight_kg: kg,
            })
        })
        .collect();

    let blood_pressure = sorted
        .iter()
        .filter_map(|c| {
            match (
                c.measurements.blood_pressure_systolic,
                c.measurements.blood_pressure_diastolic,
            ) {
                (Some(systolic), Some(diastolic)) => Some(BloodPressurePoint {
                    date: c.checkup_date,
                    week: c.gestational_weeks.unwrap_or(0),
                    systolic,
                    diastolic,
                }),
                _ => None,
            }
        })
        .collect();

    TrendSeries {
        weight,
        blood_pressure,
    }
}

/// Returns `None` for an empty series.
pub fn summarize_weight(points: &[WeightPoint]) -> Option<WeightSummary> {
    let first = points.first()?.weight_kg;
    let last = points.last()?.weight_kg;
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.weight_kg), hi.max(p.weight_kg))
        });
    Some(WeightSummary {
        first_kg: first,
        last_kg: last,
        min_kg: min,
        max_kg: max,
        change_kg: last - first,
    })
}
