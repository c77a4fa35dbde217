//! Hosted backend adapter. Implements the record ports over a PostgREST endpoint
//! (the REST layer of a Supabase project).
//!
//! Tables are addressed as `{base_url}/rest/v1/{table}`. Filters use the
//! `column=op.value` syntax; writes ask for `Prefer: return=representation`
//! so the stored row comes back in the response.

use crate::domain::record::{apply_patch, timestamp_key};
use crate::domain::{
    DomainError, ListOrder, OrderBy, Pregnancy, Record, Reminder, SortDirection,
    drafts::Validate,
};
use crate::ports::{Clock, PregnancyStore, RecordStore, ReminderStore};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info};

/// Query pairs for a PostgREST request.
pub type Query = Vec<(String, String)>;

fn eq(column: &str, value: impl std::fmt::Display) -> (String, String) {
    (column.to_string(), format!("eq.{}", value))
}

fn direction_suffix(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "asc",
        SortDirection::Descending => "desc",
    }
}

/// `order=` value: the primary column, then `created_at` and `id` as tie-breakers.
pub fn order_param<R: Record>(order: ListOrder) -> String {
    let dir = direction_suffix(order.direction);
    match order.by {
        OrderBy::RecordDate => format!(
            "{}.{dir},created_at.{dir},id.{dir}",
            order.column::<R>()
        ),
        OrderBy::CreatedAt => format!("created_at.{dir},id.{dir}"),
    }
}

pub fn get_query(id: &str) -> Query {
    vec![eq("id", id), ("limit".into(), "1".into())]
}

pub fn list_query<R: Record>(parent_id: &str, order: ListOrder) -> Query {
    vec![
        eq(R::PARENT_COLUMN, parent_id),
        ("order".into(), order_param::<R>(order)),
    ]
}

pub fn active_query(owner_id: &str) -> Query {
    vec![
        eq(Pregnancy::PARENT_COLUMN, owner_id),
        eq("is_active", true),
        ("limit".into(), "1".into()),
    ]
}

pub fn upcoming_query(pregnancy_id: &str, as_of: NaiveDate, limit: usize) -> Query {
    vec![
        eq(Reminder::PARENT_COLUMN, pregnancy_id),
        eq("is_completed", false),
        (
            Reminder::DATE_COLUMN.to_string(),
            format!("gte.{}", as_of.format("%Y-%m-%d")),
        ),
        (
            "order".into(),
            order_param::<Reminder>(ListOrder::by_date(SortDirection::Ascending)),
        ),
        ("limit".into(), limit.to_string()),
    ]
}

/// Filter selecting the flagged siblings of a parent, optionally sparing one row.
pub fn flagged_siblings_query<R: Record>(parent_id: &str, except_id: Option<&str>) -> Query {
    let mut query = vec![eq(R::PARENT_COLUMN, parent_id)];
    if let Some(flag) = R::FLAG_COLUMN {
        query.push(eq(flag, true));
    }
    if let Some(id) = except_id {
        query.push(("id".into(), format!("neq.{}", id)));
    }
    query
}

/// Serializes a patch and stamps `updated_at` on tables that track it.
pub fn patch_body<R: Record>(
    patch: &R::Patch,
    now: DateTime<Utc>,
) -> Result<serde_json::Value, DomainError> {
    let mut body = serde_json::to_value(patch)
        .map_err(|e| DomainError::Validation(format!("bad {} patch: {}", R::ENTITY, e)))?;
    if R::HAS_UPDATED_AT {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("updated_at".into(), timestamp_key(now).into());
        }
    }
    Ok(body)
}

/// Merges `patch` into `current` as last read, so the merged row is checked
/// before anything is sent, then builds the PATCH body.
pub fn checked_patch_body<R: Record>(
    current: &R,
    patch: &R::Patch,
    now: DateTime<Utc>,
) -> Result<serde_json::Value, DomainError> {
    apply_patch(current, patch, now)?;
    patch_body::<R>(patch, now)
}

/// PostgREST-backed store.
///
/// `api_key` is the project's anon key. `access_token` is the signed-in
/// user's JWT; without it requests run with the anon role.
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    clock: Arc<dyn Clock>,
}

impl PostgrestStore {
    pub fn new(
        base_url: String,
        api_key: String,
        access_token: Option<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            access_token,
            clock,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        req.header("apikey", &self.api_key)
            .bearer_auth(bearer)
            .header("Accept", "application/json")
    }

    async fn send(req: RequestBuilder) -> Result<Response, DomainError> {
        let res = req
            .send()
            .await
            .map_err(|e| DomainError::Storage(format!("Request failed: {}", e)))?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(DomainError::Storage(format!(
                "Backend error {}: {}",
                status, text
            )));
        }
        Ok(res)
    }

    async fn rows<T: DeserializeOwned>(res: Response) -> Result<Vec<T>, DomainError> {
        res.json::<Vec<T>>()
            .await
            .map_err(|e| DomainError::Storage(format!("Invalid backend response: {}", e)))
    }

    async fn select<R: Record>(&self, query: &Query) -> Result<Vec<R>, DomainError> {
        let req = self.authorized(self.client.get(self.table_url(R::TABLE)).query(query));
        Self::rows(Self::send(req).await?).await
    }

    async fn patch_where<R: Record>(
        &self,
        query: &Query,
        body: &serde_json::Value,
    ) -> Result<Vec<R>, DomainError> {
        let req = self.authorized(
            self.client
                .patch(self.table_url(R::TABLE))
                .query(query)
                .header("Prefer", "return=representation")
                .json(body),
        );
        Self::rows(Self::send(req).await?).await
    }

    async fn demote_siblings<R: Record>(
        &self,
        parent_id: &str,
        except_id: Option<&str>,
    ) -> Result<(), DomainError> {
        let Some(flag) = R::FLAG_COLUMN else {
            return Ok(());
        };
        let mut body = serde_json::Map::new();
        body.insert(flag.to_string(), false.into());
        if R::HAS_UPDATED_AT {
            body.insert("updated_at".into(), timestamp_key(self.clock.now()).into());
        }
        let cleared: Vec<R> = self
            .patch_where(
                &flagged_siblings_query::<R>(parent_id, except_id),
                &serde_json::Value::Object(body),
            )
            .await?;
        if !cleared.is_empty() {
            debug!(table = R::TABLE, count = cleared.len(), "cleared flag on siblings");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<R: Record> RecordStore<R> for PostgrestStore {
    async fn get(&self, id: &str) -> Result<Option<R>, DomainError> {
        let mut found = self.select::<R>(&get_query(id)).await?;
        Ok(found.pop())
    }

    async fn list(&self, parent_id: &str, order: ListOrder) -> Result<Vec<R>, DomainError> {
        self.select::<R>(&list_query::<R>(parent_id, order)).await
    }

    async fn create(&self, draft: &R::Draft) -> Result<R, DomainError> {
        draft.validate()?;
        let body = serde_json::to_value(draft)
            .map_err(|e| DomainError::Validation(format!("bad {} input: {}", R::ENTITY, e)))?;
        if R::EXCLUSIVE_FLAG {
            let flagged = R::FLAG_COLUMN
                .and_then(|flag| body.get(flag))
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            let parent = body
                .get(R::PARENT_COLUMN)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            if flagged && !parent.is_empty() {
                self.demote_siblings::<R>(parent, None).await?;
            }
        }
        let req = self.authorized(
            self.client
                .post(self.table_url(R::TABLE))
                .header("Prefer", "return=representation")
                .json(&body),
        );
        let mut created: Vec<R> = Self::rows(Self::send(req).await?).await?;
        let record = created
            .pop()
            .ok_or_else(|| DomainError::Storage(format!("{} insert returned no row", R::ENTITY)))?;
        info!(table = R::TABLE, id = record.id(), "created record");
        Ok(record)
    }

    async fn update(&self, id: &str, patch: &R::Patch) -> Result<R, DomainError> {
        patch.validate()?;
        let current: R = RecordStore::<R>::get(self, id)
            .await?
            .ok_or_else(|| DomainError::not_found(R::ENTITY, id))?;
        let body = checked_patch_body::<R>(&current, patch, self.clock.now())?;
        let raising_flag = R::EXCLUSIVE_FLAG
            && R::FLAG_COLUMN
                .and_then(|flag| body.get(flag))
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
        if raising_flag {
            self.demote_siblings::<R>(current.parent_id(), Some(id))
                .await?;
        }
        let by_id: Query = vec![eq("id", id)];
        let mut updated: Vec<R> = self.patch_where::<R>(&by_id, &body).await?;
        let record = updated
            .pop()
            .ok_or_else(|| DomainError::not_found(R::ENTITY, id))?;
        info!(table = R::TABLE, id, "updated record");
        Ok(record)
    }
}

#[async_trait::async_trait]
impl PregnancyStore for PostgrestStore {
    async fn get_active(&self, owner_id: &str) -> Result<Option<Pregnancy>, DomainError> {
        let mut found = self.select::<Pregnancy>(&active_query(owner_id)).await?;
        Ok(found.pop())
    }
}

#[async_trait::async_trait]
impl ReminderStore for PostgrestStore {
    async fn list_upcoming(
        &self,
        pregnancy_id: &str,
        as_of: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Reminder>, DomainError> {
        self.select::<Reminder>(&upcoming_query(pregnancy_id, as_of, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::domain::record::stamp_new;
    use crate::domain::{
        Checkup, CheckupPatch, NewPregnancy, PregnancyPatch, ReminderPatch, Ultrasound,
    };
    use chrono::TimeZone;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_list_query_orders_with_tie_breakers() {
        let q = list_query::<Checkup>("p1", ListOrder::default_for::<Checkup>());
        assert_eq!(
            q,
            vec![
                pair("pregnancy_id", "eq.p1"),
                pair("order", "checkup_date.desc,created_at.desc,id.desc"),
            ]
        );
    }

    #[test]
    fn test_list_query_for_pregnancies_filters_by_owner() {
        let q = list_query::<Pregnancy>(
            "u1",
            ListOrder {
                by: OrderBy::CreatedAt,
                direction: SortDirection::Ascending,
            },
        );
        assert_eq!(
            q,
            vec![pair("user_id", "eq.u1"), pair("order", "created_at.asc,id.asc")]
        );
    }

    #[test]
    fn test_upcoming_query_shape() {
        let q = upcoming_query("p1", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 5);
        assert_eq!(
            q,
            vec![
                pair("pregnancy_id", "eq.p1"),
                pair("is_completed", "eq.false"),
                pair("reminder_date", "gte.2024-03-01"),
                pair("order", "reminder_date.asc,created_at.asc,id.asc"),
                pair("limit", "5"),
            ]
        );
    }

    #[test]
    fn test_active_and_sibling_filters() {
        assert_eq!(
            active_query("u1"),
            vec![pair("user_id", "eq.u1"), pair("is_active", "eq.true"), pair("limit", "1")]
        );
        assert_eq!(
            flagged_siblings_query::<Pregnancy>("u1", Some("keep")),
            vec![pair("user_id", "eq.u1"), pair("is_active", "eq.true"), pair("id", "neq.keep")]
        );
        // no flag column: parent filter only
        assert_eq!(
            flagged_siblings_query::<Ultrasound>("p1", None),
            vec![pair("pregnancy_id", "eq.p1")]
        );
    }

    #[test]
    fn test_patch_body_stamps_updated_at_only_where_tracked() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let patch = CheckupPatch {
            notes: Some(Some("ok".into())),
            performed_by: Some(None),
            ..Default::default()
        };
        let body = patch_body::<Checkup>(&patch, now).unwrap();
        assert_eq!(body["notes"], "ok");
        assert!(body["performed_by"].is_null());
        assert_eq!(body["updated_at"], "2024-03-01T08:00:00.000000Z");

        let body = patch_body::<Reminder>(&ReminderPatch::reopened(), now).unwrap();
        assert!(body.get("updated_at").is_none());
        assert!(body["completed_at"].is_null());

        let body = patch_body::<Pregnancy>(&PregnancyPatch::default(), now).unwrap();
        assert_eq!(body.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_checked_patch_body_rejects_invalid_merge() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut draft = NewPregnancy::new("u1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        draft.expected_due_date = NaiveDate::from_ymd_opt(2024, 10, 7);
        let current: Pregnancy = stamp_new(&draft, "p-1", now).unwrap();

        let late_lmp = PregnancyPatch {
            last_menstruation_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..Default::default()
        };
        let res = checked_patch_body::<Pregnancy>(&current, &late_lmp, now);
        assert!(matches!(res, Err(DomainError::Validation(_))));

        let ok = PregnancyPatch {
            ultrasound_due_date: Some(NaiveDate::from_ymd_opt(2024, 10, 3)),
            ..Default::default()
        };
        let body = checked_patch_body::<Pregnancy>(&current, &ok, now).unwrap();
        assert_eq!(body["ultrasound_due_date"], "2024-10-03");
        assert!(body.get("last_menstruation_date").is_none());
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let store = PostgrestStore::new(
            "https://example.supabase.co/".into(),
            "anon".into(),
            None,
            clock,
        );
        assert_eq!(
            store.table_url("reminders"),
            "https://example.supabase.co/rest/v1/reminders"
        );
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_draft_before_any_request() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let store = PostgrestStore::new("http://127.0.0.1:9".into(), "anon".into(), None, clock);
        let draft = crate::domain::NewReminder::new(
            "p1",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            crate::domain::ReminderType::Other,
            "",
        );
        let res: Result<Reminder, _> = store.create(&draft).await;
        assert!(matches!(res, Err(DomainError::Validation(_))));
    }
}
