//! Summary store gateway
//!
//! Durable home of the per-(city, day) summaries. Implementations only need
//! plain get/put; serialising concurrent updates of one key is the
//! aggregator's job.

use std::ops::RangeInclusive;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::Result;
use crate::models::{DailySummary, HistoricalRecord, SummaryKey};

pub mod memory;
pub mod persistent;

pub use memory::InMemorySummaryStore;
pub use persistent::FjallSummaryStore;

#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn get(&self, key: &SummaryKey) -> Result<Option<DailySummary>>;

    /// Stored summary for `key`, or a zeroed one if the day has no
    /// observation yet. The zeroed summary is not written until `put`.
    async fn get_or_create(&self, key: &SummaryKey) -> Result<DailySummary> {
        Ok(self
            .get(key)
            .await?
            .unwrap_or_else(|| DailySummary::empty(key)))
    }

    async fn put(&self, summary: &DailySummary) -> Result<()>;

    /// Summaries of `city` whose day falls in `days`, oldest first
    async fn query_history(
        &self,
        city: &str,
        days: RangeInclusive<NaiveDate>,
    ) -> Result<Vec<HistoricalRecord>>;
}
