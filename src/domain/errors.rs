//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Missing or malformed required input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Store unreachable, or it rejected the operation for a reason other than "no rows".
    #[error("Storage error: {0}")]
    Storage(String),

    /// `to` precedes `from` where chronological order is required.
    #[error("Invalid date range: {to} is before {from}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export failed: {0}")]
    Export(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for mapping infrastructure errors with `map_err(DomainError::storage)`.
    pub fn storage(e: impl std::fmt::Display) -> Self {
        Self::Storage(e.to_string())
    }
}
