//! Pregnancy lifecycle: start, look up the active one, edit, history.

use crate::domain::timeline::estimated_due_date;
use crate::domain::{DomainError, ListOrder, NewPregnancy, Pregnancy, PregnancyPatch};
use crate::ports::{PregnancyStore, RecordStore};
use std::sync::Arc;
use tracing::info;

pub struct PregnancyService {
    store: Arc<dyn PregnancyStore>,
}

impl PregnancyService {
    pub fn new(store: Arc<dyn PregnancyStore>) -> Self {
        Self { store }
    }

    /// The owner's active pregnancy, if any. Having none is not an error.
    pub async fn active_pregnancy(&self, owner_id: &str) -> Result<Option<Pregnancy>, DomainError> {
        self.store.get_active(owner_id).await
    }

    pub async fn get_pregnancy(&self, id: &str) -> Result<Option<Pregnancy>, DomainError> {
        self.store.get(id).await
    }

    /// Creates a pregnancy. A missing due date is estimated from the LMP.
    /// If the new record is active, the owner's previous active one is deactivated.
    pub async fn start_pregnancy(&self, mut draft: NewPregnancy) -> Result<Pregnancy, DomainError> {
        if draft.expected_due_date.is_none() {
            draft.expected_due_date = draft.last_menstruation_date.map(estimated_due_date);
        }
        let pregnancy = self.store.create(&draft).await?;
        info!(
            pregnancy_id = %pregnancy.id,
            user_id = %pregnancy.user_id,
            due = %pregnancy.expected_due_date,
            "started pregnancy"
        );
        Ok(pregnancy)
    }

    pub async fn update_pregnancy(
        &self,
        id: &str,
        patch: &PregnancyPatch,
    ) -> Result<Pregnancy, DomainError> {
        self.store.update(id, patch).await
    }

    /// All of the owner's pregnancies, oldest first.
    pub async fn list_pregnancies(&self, owner_id: &str) -> Result<Vec<Pregnancy>, DomainError> {
        self.store
            .list(owner_id, ListOrder::default_for::<Pregnancy>())
            .await
    }
}
