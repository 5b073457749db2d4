use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::SummaryStore;
use crate::Result;
use crate::models::{DailySummary, HistoricalRecord, SummaryKey};

/// Process-local store backed by an ordered map
#[derive(Default)]
pub struct InMemorySummaryStore {
    summaries: RwLock<BTreeMap<SummaryKey, DailySummary>>,
}

impl InMemorySummaryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.summaries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.summaries.read().await.is_empty()
    }
}

#[async_trait]
impl SummaryStore for InMemorySummaryStore {
    async fn get(&self, key: &SummaryKey) -> Result<Option<DailySummary>> {
        Ok(self.summaries.read().await.get(key).cloned())
    }

    async fn put(&self, summary: &DailySummary) -> Result<()> {
        self.summaries
            .write()
            .await
            .insert(summary.key(), summary.clone());
        Ok(())
    }

    async fn query_history(
        &self,
        city: &str,
        days: RangeInclusive<NaiveDate>,
    ) -> Result<Vec<HistoricalRecord>> {
        if days.is_empty() {
            return Ok(Vec::new());
        }
        let start = SummaryKey::new(city, *days.start());
        let end = SummaryKey::new(city, *days.end());
        Ok(self
            .summaries
            .read()
            .await
            .range(start..=end)
            .map(|(_, summary)| HistoricalRecord::from(summary.clone()))
            .collect())
    }
}
