//! Hosted backend stores.

pub mod postgrest;

pub use postgrest::PostgrestStore;
