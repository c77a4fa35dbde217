//! CSV export of trend series. Uses the `csv` crate for safe serialization.
//!
//! Format: semicolon-delimited with a header row, one file per series.

use crate::domain::{BloodPressurePoint, DomainError, TrendSeries, WeightPoint};
use std::path::{Path, PathBuf};
use tracing::info;

fn export_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Export(e.to_string())
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, DomainError> {
    let bytes = wtr.into_inner().map_err(export_err)?;
    String::from_utf8(bytes).map_err(export_err)
}

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(Vec::new())
}

/// `Date;Week;WeightKg`
pub fn weight_series_to_csv(points: &[WeightPoint]) -> Result<String, DomainError> {
    let mut wtr = writer();
    wtr.write_record(["Date", "Week", "WeightKg"])
        .map_err(export_err)?;
    for p in points {
        wtr.write_record([
            p.date.format("%Y-%m-%d").to_string(),
            p.week.to_string(),
            format!("{:.1}", p.weight_kg),
        ])
        .map_err(export_err)?;
    }
    wtr.flush().map_err(export_err)?;
    finish(wtr)
}

/// `Date;Week;Systolic;Diastolic`
pub fn blood_pressure_series_to_csv(points: &[BloodPressurePoint]) -> Result<String, DomainError> {
    let mut wtr = writer();
    wtr.write_record(["Date", "Week", "Systolic", "Diastolic"])
        .map_err(export_err)?;
    for p in points {
        wtr.write_record([
            p.date.format("%Y-%m-%d").to_string(),
            p.week.to_string(),
            p.systolic.to_string(),
            p.diastolic.to_string(),
        ])
        .map_err(export_err)?;
    }
    wtr.flush().map_err(export_err)?;
    finish(wtr)
}

/// Paths written by [`write_trend_csv`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFiles {
    pub weight: PathBuf,
    pub blood_pressure: PathBuf,
}

/// Writes `{pregnancy_id}_weight.csv` and `{pregnancy_id}_blood_pressure.csv`
/// into `dir`, creating it if needed. Existing files are overwritten.
pub async fn write_trend_csv(
    dir: impl AsRef<Path>,
    pregnancy_id: &str,
    series: &TrendSeries,
) -> Result<ExportedFiles, DomainError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await.map_err(export_err)?;

    let files = ExportedFiles {
        weight: dir.join(format!("{}_weight.csv", pregnancy_id)),
        blood_pressure: dir.join(format!("{}_blood_pressure.csv", pregnancy_id)),
    };
    tokio::fs::write(&files.weight, weight_series_to_csv(&series.weight)?)
        .await
        .map_err(export_err)?;
    tokio::fs::write(
        &files.blood_pressure,
        blood_pressure_series_to_csv(&series.blood_pressure)?,
    )
    .await
    .map_err(export_err)?;

    info!(
        pregnancy_id,
        weight_points = series.weight.len(),
        blood_pressure_points = series.blood_pressure.len(),
        dir = %dir.display(),
        "exported trend CSV"
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_weight_csv_has_header_and_rows() {
        let points = vec![
            WeightPoint {
                date: d(2024, 2, 1),
                week: 4,
                weight_kg: 62.0,
            },
            WeightPoint {
                date: d(2024, 3, 1),
                week: 8,
                weight_kg: 63.4,
            },
        ];
        let csv = weight_series_to_csv(&points).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, ["Date;Week;WeightKg", "2024-02-01;4;62.0", "2024-03-01;8;63.4"]);
    }

    #[test]
    fn test_empty_series_is_header_only() {
        let csv = blood_pressure_series_to_csv(&[]).unwrap();
        assert_eq!(csv, "Date;Week;Systolic;Diastolic\n");
    }

    #[tokio::test]
    async fn test_write_trend_csv_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exports");
        let series = TrendSeries {
            weight: vec![],
            blood_pressure: vec![BloodPressurePoint {
                date: d(2024, 3, 1),
                week: 8,
                systolic: 118,
                diastolic: 76,
            }],
        };
        let files = write_trend_csv(&out, "p1", &series).await.unwrap();
        assert_eq!(files.weight, out.join("p1_weight.csv"));
        let bp = tokio::fs::read_to_string(&files.blood_pressure).await.unwrap();
        assert_eq!(bp, "Date;Week;Systolic;Diastolic\n2024-03-01;8;118;76\n");
        let weight = tokio::fs::read_to_string(&files.weight).await.unwrap();
        assert_eq!(weight, "Date;Week;WeightKg\n");
    }
}
