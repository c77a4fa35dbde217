//! pregnancy-journal: pregnancy timeline, clinical journal and reminders with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
