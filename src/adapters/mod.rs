//! Infrastructure adapters. Implement outbound ports.
//!
//! Local SQLite, in-memory, hosted PostgREST backend, clocks, file export.
//! Map errors to DomainError.

pub mod backend;
pub mod clock;
pub mod export;
pub mod persistence;
