//! SQLite-backed store via libsql. Implements every record port against a local file.
//!
//! One table per entity. Each row keeps the record's JSON in `body` next to the
//! indexed columns the ports filter and sort on (`parent_id`, `record_date`,
//! `created_at`, `flag`). All tables share one database file: data/pregnancy.db

use crate::domain::record::{apply_patch, clear_flag, stamp_new, timestamp_key};
use crate::domain::{
    BloodTest, Checkup, DomainError, ListOrder, OrderBy, Pregnancy, Record, Reminder,
    SortDirection, Ultrasound,
};
use crate::ports::{Clock, PregnancyStore, RecordStore, ReminderStore};
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const DB_FILE: &str = "pregnancy.db";

/// SQLite repository. Connections are opened per call; the struct is safe to share via Arc.
pub struct SqliteRepo {
    db: Database,
    db_path: PathBuf,
    clock: Arc<dyn Clock>,
}

fn table_ddl<R: Record>() -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    id TEXT PRIMARY KEY,
    parent_id TEXT NOT NULL,
    record_date TEXT NOT NULL,
    created_at TEXT NOT NULL,
    flag INTEGER NOT NULL DEFAULT 0,
    body TEXT NOT NULL
)"#,
        table = R::TABLE
    )
}

fn index_ddl<R: Record>() -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_parent_date ON {table} (parent_id, record_date)",
        table = R::TABLE
    )
}

/// Enforces "at most one flagged row per parent" in the schema itself.
fn exclusive_flag_ddl<R: Record>() -> String {
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_{table}_one_flagged ON {table} (parent_id) WHERE flag = 1",
        table = R::TABLE
    )
}

fn order_clause(order: ListOrder) -> &'static str {
    match (order.by, order.direction) {
        (OrderBy::RecordDate, SortDirection::Ascending) => {
            "ORDER BY record_date ASC, created_at ASC, id ASC"
        }
        (OrderBy::RecordDate, SortDirection::Descending) => {
            "ORDER BY record_date DESC, created_at DESC, id DESC"
        }
        (OrderBy::CreatedAt, SortDirection::Ascending) => "ORDER BY created_at ASC, id ASC",
        (OrderBy::CreatedAt, SortDirection::Descending) => "ORDER BY created_at DESC, id DESC",
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl SqliteRepo {
    /// Connect to (or create) the database and ensure every table exists.
    /// Call this once at startup.
    pub async fn connect(
        base_dir: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(DomainError::storage)?;
        let db_path = base.join(DB_FILE);
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(DomainError::storage)?;
        let conn = db.connect().map_err(DomainError::storage)?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DomainError::Storage(format!("WAL pragma failed: {}", e)))?;
        while wal_rows.next().await.map_err(DomainError::storage)?.is_some() {}

        Self::ensure_table::<Pregnancy>(&conn).await?;
        Self::ensure_table::<Checkup>(&conn).await?;
        Self::ensure_table::<Ultrasound>(&conn).await?;
        Self::ensure_table::<BloodTest>(&conn).await?;
        Self::ensure_table::<Reminder>(&conn).await?;

        info!(path = %db_path.display(), "SQLite connected with WAL mode");

        Ok(Self {
            db,
            db_path,
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn ensure_table<R: Record>(conn: &Connection) -> Result<(), DomainError> {
        conn.execute(&table_ddl::<R>(), ())
            .await
            .map_err(DomainError::storage)?;
        conn.execute(&index_ddl::<R>(), ())
            .await
            .map_err(DomainError::storage)?;
        if R::EXCLUSIVE_FLAG {
            conn.execute(&exclusive_flag_ddl::<R>(), ())
                .await
                .map_err(DomainError::storage)?;
        }
        Ok(())
    }

    fn connection(&self) -> Result<Connection, DomainError> {
        self.db.connect().map_err(DomainError::storage)
    }

    fn decode<R: Record>(body: &str) -> Result<R, DomainError> {
        serde_json::from_str(body)
            .map_err(|e| DomainError::Storage(format!("corrupt {} row: {}", R::ENTITY, e)))
    }

    /// Runs a `SELECT body ...` query and decodes every row.
    async fn query_records<R: Record>(
        conn: &Connection,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<R>, DomainError> {
        let mut rows = conn.query(sql, params).await.map_err(DomainError::storage)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await.map_err(DomainError::storage)? {
            let body: String = row.get(0).map_err(DomainError::storage)?;
            records.push(Self::decode::<R>(&body)?);
        }
        Ok(records)
    }

    async fn find<R: Record>(conn: &Connection, id: &str) -> Result<Option<R>, DomainError> {
        let sql = format!("SELECT body FROM {} WHERE id = ?1", R::TABLE);
        let mut found = Self::query_records::<R>(conn, &sql, params![id]).await?;
        Ok(found.pop())
    }

    /// Clears the flag on every other flagged row of `keep`'s parent.
    async fn demote_siblings<R: Record>(
        conn: &Connection,
        keep: &R,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let sql = format!(
            "SELECT body FROM {} WHERE parent_id = ?1 AND flag = 1 AND id != ?2",
            R::TABLE
        );
        let siblings =
            Self::query_records::<R>(conn, &sql, params![keep.parent_id(), keep.id()]).await?;
        let update = format!("UPDATE {} SET flag = 0, body = ?1 WHERE id = ?2", R::TABLE);
        for sibling in siblings {
            let cleared = clear_flag(&sibling, now)?;
            let body = serde_json::to_string(&cleared).map_err(DomainError::storage)?;
            conn.execute(&update, params![body, cleared.id()])
                .await
                .map_err(DomainError::storage)?;
            debug!(table = R::TABLE, id = cleared.id(), "cleared flag on sibling");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<R: Record> RecordStore<R> for SqliteRepo {
    async fn get(&self, id: &str) -> Result<Option<R>, DomainError> {
        let conn = self.connection()?;
        Self::find::<R>(&conn, id).await
    }

    async fn list(&self, parent_id: &str, order: ListOrder) -> Result<Vec<R>, DomainError> {
        let conn = self.connection()?;
        let sql = format!(
            "SELECT body FROM {} WHERE parent_id = ?1 {}",
            R::TABLE,
            order_clause(order)
        );
        Self::query_records::<R>(&conn, &sql, params![parent_id]).await
    }

    async fn create(&self, draft: &R::Draft) -> Result<R, DomainError> {
        let now = self.clock.now();
        let id = uuid::Uuid::new_v4().to_string();
        let record: R = stamp_new(draft, &id, now)?;
        let body = serde_json::to_string(&record).map_err(DomainError::storage)?;

        let conn = self.connection()?;
        let tx = conn.transaction().await.map_err(DomainError::storage)?;
        if R::EXCLUSIVE_FLAG && record.flag() {
            Self::demote_siblings(&tx, &record, now).await?;
        }
        let sql = format!(
            "INSERT INTO {} (id, parent_id, record_date, created_at, flag, body) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            R::TABLE
        );
        tx.execute(
            &sql,
            params![
                id.as_str(),
                record.parent_id(),
                date_key(record.record_date()),
                timestamp_key(record.created_at()),
                i64::from(record.flag()),
                body
            ],
        )
        .await
        .map_err(DomainError::storage)?;
        tx.commit().await.map_err(DomainError::storage)?;

        info!(table = R::TABLE, id = %id, parent_id = record.parent_id(), "created record");
        Ok(record)
    }

    async fn update(&self, id: &str, patch: &R::Patch) -> Result<R, DomainError> {
        let now = self.clock.now();
        let conn = self.connection()?;
        let tx = conn.transaction().await.map_err(DomainError::storage)?;
        let current = Self::find::<R>(&tx, id)
            .await?
            .ok_or_else(|| DomainError::not_found(R::ENTITY, id))?;
        let updated = apply_patch(&current, patch, now)?;
        if R::EXCLUSIVE_FLAG && updated.flag() {
            Self::demote_siblings(&tx, &updated, now).await?;
        }
        let body = serde_json::to_string(&updated).map_err(DomainError::storage)?;
        let sql = format!(
            "UPDATE {} SET record_date = ?1, flag = ?2, body = ?3 WHERE id = ?4",
            R::TABLE
        );
        tx.execute(
            &sql,
            params![
                date_key(updated.record_date()),
                i64::from(updated.flag()),
                body,
                id
            ],
        )
        .await
        .map_err(DomainError::storage)?;
        tx.commit().await.map_err(DomainError::storage)?;

        info!(table = R::TABLE, id, "updated record");
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl PregnancyStore for SqliteRepo {
    async fn get_active(&self, owner_id: &str) -> Result<Option<Pregnancy>, DomainError> {
        let conn = self.connection()?;
        let sql = format!(
            "SELECT body FROM {} WHERE parent_id = ?1 AND flag = 1 LIMIT 1",
            Pregnancy::TABLE
        );
        let mut found = Self::query_records::<Pregnancy>(&conn, &sql, params![owner_id]).await?;
        Ok(found.pop())
    }
}

#[async_trait::async_trait]
impl ReminderStore for SqliteRepo {
    async fn list_upcoming(
        &self,
        pregnancy_id: &str,
        as_of: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Reminder>, DomainError> {
        let conn = self.connection()?;
        let sql = format!(
            r#"
            SELECT body FROM {}
            WHERE parent_id = ?1 AND flag = 0 AND record_date >= ?2
            ORDER BY record_date ASC, created_at ASC, id ASC
            LIMIT ?3
            "#,
            Reminder::TABLE
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Self::query_records::<Reminder>(&conn, &sql, params![pregnancy_id, date_key(as_of), limit])
            .await
    }
}
