//! Weight and blood-pressure trends over a pregnancy's checkups.

use crate::adapters::export::{ExportedFiles, write_trend_csv};
use crate::domain::trends::{build_trends, summarize_weight};
use crate::domain::{
    Checkup, DomainError, ListOrder, SortDirection, TrendSeries, WeightSummary,
};
use crate::ports::RecordStore;
use std::path::Path;
use std::sync::Arc;

pub struct TrendService {
    checkups: Arc<dyn RecordStore<Checkup>>,
}

impl TrendService {
    pub fn new(checkups: Arc<dyn RecordStore<Checkup>>) -> Self {
        Self { checkups }
    }

    /// Both series, oldest checkup first.
    pub async fn trends(&self, pregnancy_id: &str) -> Result<TrendSeries, DomainError> {
        let checkups = self
            .checkups
            .list(pregnancy_id, ListOrder::by_date(SortDirection::Ascending))
            .await?;
        Ok(build_trends(&checkups))
    }

    /// `None` when no checkup has a weight.
    pub async fn weight_summary(
        &self,
        pregnancy_id: &str,
    ) -> Result<Option<WeightSummary>, DomainError> {
        let series = self.trends(pregnancy_id).await?;
        Ok(summarize_weight(&series.weight))
    }

    pub async fn export_csv(
        &self,
        pregnancy_id: &str,
        dir: impl AsRef<Path>,
    ) -> Result<ExportedFiles, DomainError> {
        let series = self.trends(pregnancy_id).await?;
        write_trend_csv(dir, pregnancy_id, &series).await
    }
}
