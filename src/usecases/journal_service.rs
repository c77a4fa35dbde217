//! Clinical journal: checkups, ultrasounds and blood tests for one pregnancy.

use crate::domain::timeline::gestational_age_on;
use crate::domain::{
    BloodTest, BloodTestPatch, Checkup, CheckupPatch, DomainError, ListOrder, NewBloodTest,
    NewCheckup, NewUltrasound, Pregnancy, Record, Ultrasound, UltrasoundPatch,
};
use crate::ports::{PregnancyStore, RecordStore};
use std::sync::Arc;
use tracing::{debug, info};

pub struct JournalService {
    pregnancies: Arc<dyn PregnancyStore>,
    checkups: Arc<dyn RecordStore<Checkup>>,
    ultrasounds: Arc<dyn RecordStore<Ultrasound>>,
    blood_tests: Arc<dyn RecordStore<BloodTest>>,
}

impl JournalService {
    pub fn new(
        pregnancies: Arc<dyn PregnancyStore>,
        checkups: Arc<dyn RecordStore<Checkup>>,
        ultrasounds: Arc<dyn RecordStore<Ultrasound>>,
        blood_tests: Arc<dyn RecordStore<BloodTest>>,
    ) -> Self {
        Self {
            pregnancies,
            checkups,
            ultrasounds,
            blood_tests,
        }
    }

    async fn pregnancy(&self, id: &str) -> Result<Pregnancy, DomainError> {
        self.pregnancies
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(Pregnancy::ENTITY, id))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Checkups
    // ─────────────────────────────────────────────────────────────────────

    /// Records a checkup. When the caller leaves the gestational snapshot
    /// empty it is computed from the pregnancy's LMP and the checkup date.
    ///
    /// # Errors
    /// `NotFound` when the pregnancy does not exist.
    pub async fn create_checkup(&self, mut draft: NewCheckup) -> Result<Checkup, DomainError> {
        let pregnancy = self.pregnancy(&draft.pregnancy_id).await?;
        if draft.gestational_weeks.is_none() && draft.checkup_date >= pregnancy.last_menstruation_date
        {
            let age = gestational_age_on(pregnancy.last_menstruation_date, draft.checkup_date);
            debug!(pregnancy_id = %pregnancy.id, %age, "filled checkup gestational age");
            draft.gestational_weeks = Some(age.weeks);
            draft.gestational_days = Some(age.days);
        }
        let checkup = self.checkups.create(&draft).await?;
        info!(pregnancy_id = %checkup.pregnancy_id, checkup_id = %checkup.id, "recorded checkup");
        Ok(checkup)
    }

    /// Newest first.
    pub async fn list_checkups(&self, pregnancy_id: &str) -> Result<Vec<Checkup>, DomainError> {
        self.checkups
            .list(pregnancy_id, ListOrder::default_for::<Checkup>())
            .await
    }

    pub async fn update_checkup(
        &self,
        id: &str,
        patch: &CheckupPatch,
    ) -> Result<Checkup, DomainError> {
        self.checkups.update(id, patch).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ultrasounds
    // ─────────────────────────────────────────────────────────────────────

    pub async fn create_ultrasound(&self, draft: &NewUltrasound) -> Result<Ultrasound, DomainError> {
        self.pregnancy(&draft.pregnancy_id).await?;
        let ultrasound = self.ultrasounds.create(draft).await?;
        info!(
            pregnancy_id = %ultrasound.pregnancy_id,
            ultrasound_id = %ultrasound.id,
            "recorded ultrasound"
        );
        Ok(ultrasound)
    }

    /// Newest first.
    pub async fn list_ultrasounds(&self, pregnancy_id: &str) -> Result<Vec<Ultrasound>, DomainError> {
        self.ultrasounds
            .list(pregnancy_id, ListOrder::default_for::<Ultrasound>())
            .await
    }

    pub async fn update_ultrasound(
        &self,
        id: &str,
        patch: &UltrasoundPatch,
    ) -> Result<Ultrasound, DomainError> {
        self.ultrasounds.update(id, patch).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Blood tests
    // ─────────────────────────────────────────────────────────────────────

    pub async fn create_blood_test(&self, draft: &NewBloodTest) -> Result<BloodTest, DomainError> {
        self.pregnancy(&draft.pregnancy_id).await?;
        let test = self.blood_tests.create(draft).await?;
        info!(pregnancy_id = %test.pregnancy_id, blood_test_id = %test.id, "recorded blood test");
        Ok(test)
    }

    /// Newest first.
    pub async fn list_blood_tests(&self, pregnancy_id: &str) -> Result<Vec<BloodTest>, DomainError> {
        self.blood_tests
            .list(pregnancy_id, ListOrder::default_for::<BloodTest>())
            .await
    }

    pub async fn update_blood_test(
        &self,
        id: &str,
        patch: &BloodTestPatch,
    ) -> Result<BloodTest, DomainError> {
        self.blood_tests.update(id, patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::adapters::persistence::MemoryRepo;
    use crate::domain::NewPregnancy;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn setup() -> (JournalService, Pregnancy) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap(),
        ));
        let repo = Arc::new(MemoryRepo::new(clock));
        let mut draft = NewPregnancy::new("u1", d(2024, 1, 1));
        draft.expected_due_date = Some(d(2024, 10, 7));
        let pregnancy: Pregnancy = repo.create(&draft).await.unwrap();
        let svc = JournalService::new(repo.clone(), repo.clone(), repo.clone(), repo);
        (svc, pregnancy)
    }

    #[tokio::test]
    async fn test_checkup_snapshot_filled_from_lmp() {
        let (svc, p) = setup().await;
        let checkup = svc
            .create_checkup(NewCheckup::new(&p.id, d(2024, 3, 25)))
            .await
            .unwrap();
        assert_eq!(checkup.gestational_weeks, Some(12));
        assert_eq!(checkup.gestational_days, Some(0));
    }

    #[tokio::test]
    async fn test_checkup_snapshot_kept_when_given() {
        let (svc, p) = setup().await;
        let mut draft = NewCheckup::new(&p.id, d(2024, 3, 25));
        draft.gestational_weeks = Some(11);
        draft.gestational_days = Some(5);
        let checkup = svc.create_checkup(draft).await.unwrap();
        assert_eq!(checkup.gestational_weeks, Some(11));
        assert_eq!(checkup.gestational_days, Some(5));
    }

    #[tokio::test]
    async fn test_checkup_for_unknown_pregnancy_is_not_found() {
        let (svc, _) = setup().await;
        let res = svc
            .create_checkup(NewCheckup::new("ghost", d(2024, 3, 25)))
            .await;
        assert!(matches!(
            res,
            Err(DomainError::NotFound {
                entity: "pregnancy",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_lists_are_newest_first() {
        let (svc, p) = setup().await;
        for date in [d(2024, 2, 1), d(2024, 3, 1), d(2024, 2, 15)] {
            svc.create_blood_test(&NewBloodTest::new(&p.id, date, "Hb"))
                .await
                .unwrap();
            svc.create_ultrasound(&NewUltrasound::new(&p.id, date, 8))
                .await
                .unwrap();
        }
        let tests = svc.list_blood_tests(&p.id).await.unwrap();
        let dates: Vec<NaiveDate> = tests.iter().map(|t| t.test_date).collect();
        assert_eq!(dates, [d(2024, 3, 1), d(2024, 2, 15), d(2024, 2, 1)]);
        let scans = svc.list_ultrasounds(&p.id).await.unwrap();
        assert_eq!(scans[0].ultrasound_date, d(2024, 3, 1));
    }

    #[tokio::test]
    async fn test_update_checkup_replaces_measurements() {
        let (svc, p) = setup().await;
        let mut draft = NewCheckup::new(&p.id, d(2024, 3, 1));
        draft.measurements.weight_kg = Some(64.0);
        draft.measurements.hemoglobin = Some(12.1);
        draft.notes = Some("tired".into());
        let checkup = svc.create_checkup(draft).await.unwrap();

        let mut measurements = checkup.measurements.clone();
        measurements.hemoglobin = None;
        measurements.blood_pressure_systolic = Some(120);
        measurements.blood_pressure_diastolic = Some(80);
        let patch = CheckupPatch {
            measurements: Some(measurements),
            ..Default::default()
        };
        let updated = svc.update_checkup(&checkup.id, &patch).await.unwrap();
        assert_eq!(updated.measurements.weight_kg, Some(64.0));
        assert_eq!(updated.measurements.hemoglobin, None);
        assert_eq!(updated.measurements.blood_pressure_systolic, Some(120));
        assert_eq!(updated.notes.as_deref(), Some("tired"));
        assert_eq!(updated.gestational_weeks, Some(8));
        assert_eq!(svc.list_checkups(&p.id).await.unwrap(), vec![updated]);
    }

    #[tokio::test]
    async fn test_update_checkup_rejects_inverted_blood_pressure() {
        let (svc, p) = setup().await;
        let mut draft = NewCheckup::new(&p.id, d(2024, 3, 1));
        draft.measurements.blood_pressure_systolic = Some(120);
        draft.measurements.blood_pressure_diastolic = Some(80);
        let checkup = svc.create_checkup(draft).await.unwrap();

        let mut measurements = checkup.measurements.clone();
        measurements.blood_pressure_systolic = Some(70);
        let patch = CheckupPatch {
            measurements: Some(measurements),
            ..Default::default()
        };
        let res = svc.update_checkup(&checkup.id, &patch).await;
        assert!(matches!(res, Err(DomainError::Validation(_))));
        let stored = svc.list_checkups(&p.id).await.unwrap();
        assert_eq!(stored[0].measurements.blood_pressure_systolic, Some(120));
    }
}
