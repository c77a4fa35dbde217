//! In-process store. Implements every record port over JSON rows held in memory.
//!
//! Used by tests and for running without a database. Same semantics as
//! `SqliteRepo`: generated UUIDs, store-side timestamps, one active pregnancy per owner.

use crate::domain::record::{apply_patch, clear_flag, sort_records, stamp_new};
use crate::domain::reminders::select_upcoming;
use crate::domain::{DomainError, ListOrder, Pregnancy, Record, Reminder};
use crate::ports::{Clock, PregnancyStore, RecordStore, ReminderStore};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Table name -> rows (insertion order).
type Tables = HashMap<&'static str, Vec<Value>>;

pub struct MemoryRepo {
    tables: RwLock<Tables>,
    clock: Arc<dyn Clock>,
}

impl MemoryRepo {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            clock,
        }
    }

    fn decode<R: Record>(row: &Value) -> Result<R, DomainError> {
        serde_json::from_value(row.clone()).map_err(DomainError::storage)
    }

    fn encode<R: Record>(record: &R) -> Result<Value, DomainError> {
        serde_json::to_value(record).map_err(DomainError::storage)
    }

    fn rows<R: Record>(tables: &Tables) -> Result<Vec<R>, DomainError> {
        tables
            .get(R::TABLE)
            .map(|rows| rows.iter().map(Self::decode::<R>).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn row_id(row: &Value) -> Option<&str> {
        row.get("id").and_then(Value::as_str)
    }

    /// Clears the flag on every other flagged row of the same parent.
    fn demote_siblings<R: Record>(
        tables: &mut Tables,
        keep: &R,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), DomainError> {
        let rows = tables.entry(R::TABLE).or_default();
        for row in rows.iter_mut() {
            let other: R = Self::decode(row)?;
            if other.id() != keep.id() && other.parent_id() == keep.parent_id() && other.flag() {
                *row = Self::encode(&clear_flag(&other, now)?)?;
                debug!(table = R::TABLE, id = other.id(), "cleared flag on sibling");
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<R: Record> RecordStore<R> for MemoryRepo {
    async fn get(&self, id: &str) -> Result<Option<R>, DomainError> {
        let tables = self.tables.read().await;
        match tables
            .get(R::TABLE)
            .and_then(|rows| rows.iter().find(|row| Self::row_id(row) == Some(id)))
        {
            Some(row) => Ok(Some(Self::decode(row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, parent_id: &str, order: ListOrder) -> Result<Vec<R>, DomainError> {
        let tables = self.tables.read().await;
        let mut records: Vec<R> = Self::rows::<R>(&tables)?
            .into_iter()
            .filter(|r| r.parent_id() == parent_id)
            .collect();
        sort_records(&mut records, order);
        Ok(records)
    }

    async fn create(&self, draft: &R::Draft) -> Result<R, DomainError> {
        let now = self.clock.now();
        let id = uuid::Uuid::new_v4().to_string();
        let record: R = stamp_new(draft, &id, now)?;
        let mut tables = self.tables.write().await;
        if R::EXCLUSIVE_FLAG && record.flag() {
            Self::demote_siblings(&mut tables, &record, now)?;
        }
        tables
            .entry(R::TABLE)
            .or_default()
            .push(Self::encode(&record)?);
        debug!(table = R::TABLE, id = %id, "created record");
        Ok(record)
    }

    async fn update(&self, id: &str, patch: &R::Patch) -> Result<R, DomainError> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;
        let current: R = match tables
            .get(R::TABLE)
            .and_then(|rows| rows.iter().find(|row| Self::row_id(row) == Some(id)))
        {
            Some(row) => Self::decode(row)?,
            None => return Err(DomainError::not_found(R::ENTITY, id)),
        };
        let updated = apply_patch(&current, patch, now)?;
        if R::EXCLUSIVE_FLAG && updated.flag() {
            Self::demote_siblings(&mut tables, &updated, now)?;
        }
        let encoded = Self::encode(&updated)?;
        if let Some(row) = tables
            .entry(R::TABLE)
            .or_default()
            .iter_mut()
            .find(|row| Self::row_id(row) == Some(id))
        {
            *row = encoded;
        }
        debug!(table = R::TABLE, id, "updated record");
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl PregnancyStore for MemoryRepo {
    async fn get_active(&self, owner_id: &str) -> Result<Option<Pregnancy>, DomainError> {
        let tables = self.tables.read().await;
        Ok(Self::rows::<Pregnancy>(&tables)?
            .into_iter()
            .find(|p| p.user_id == owner_id && p.is_active))
    }
}

#[async_trait::async_trait]
impl ReminderStore for MemoryRepo {
    async fn list_upcoming(
        &self,
        pregnancy_id: &str,
        as_of: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Reminder>, DomainError> {
        let tables = self.tables.read().await;
        let reminders: Vec<Reminder> = Self::rows::<Reminder>(&tables)?
            .into_iter()
            .filter(|r| r.pregnancy_id == pregnancy_id)
            .collect();
        Ok(select_upcoming(&reminders, as_of, limit))
    }
}
