//! File exports.

pub mod csv_export;

pub use csv_export::{ExportedFiles, write_trend_csv};
