use std::ops::RangeInclusive;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use fjall::Keyspace;
use tokio::task;

use super::SummaryStore;
use crate::models::{DailySummary, HistoricalRecord, SummaryKey};
use crate::{Result, WeatherWatchError};

const KEYSPACE: &str = "summaries";

/// Durable summary store on a local `fjall` database.
///
/// Summaries are `postcard`-encoded under `"{city}/{YYYY-MM-DD}"`. History
/// queries probe one key per day, so callers bound the range.
pub struct FjallSummaryStore {
    store: Keyspace,
}

fn get_from_store(store: &Keyspace, key: &str) -> anyhow::Result<Option<DailySummary>> {
    match store.get(key.as_bytes())? {
        Some(bytes) => Ok(Some(postcard::from_bytes(&bytes)?)),
        None => Ok(None),
    }
}

impl FjallSummaryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = fjall::Database::builder(path)
            .open()
            .map_err(|e| WeatherWatchError::store(format!("failed to open {}: {e}", path.display())))?;
        let store = db
            .keyspace(KEYSPACE, fjall::KeyspaceCreateOptions::default)
            .map_err(|e| WeatherWatchError::store(format!("failed to open keyspace: {e}")))?;
        tracing::info!("Opened summary store at {}", path.display());
        Ok(Self { store })
    }
}

#[async_trait]
impl SummaryStore for FjallSummaryStore {
    #[tracing::instrument(name = "get_summary", level = "debug", skip(self))]
    async fn get(&self, key: &SummaryKey) -> Result<Option<DailySummary>> {
        let store = self.store.clone();
        let storage_key = key.to_storage_key();

        task::spawn_blocking(move || get_from_store(&store, &storage_key))
            .await
            .map_err(|e| WeatherWatchError::store(e.to_string()))?
            .map_err(|e| WeatherWatchError::store(format!("failed to read {key}: {e}")))
    }

    #[tracing::instrument(name = "put_summary", level = "debug", skip(self, summary), fields(key = %summary.key()))]
    async fn put(&self, summary: &DailySummary) -> Result<()> {
        let store = self.store.clone();
        let key = summary.key().to_storage_key();
        let bytes = postcard::to_stdvec(summary)
            .map_err(|e| WeatherWatchError::store(format!("failed to encode summary: {e}")))?;

        task::spawn_blocking(move || store.insert(key.into_bytes(), bytes))
            .await
            .map_err(|e| WeatherWatchError::store(e.to_string()))?
            .map_err(|e| WeatherWatchError::store(format!("write failed: {e}")))?;
        Ok(())
    }

    #[tracing::instrument(name = "query_history", level = "debug", skip(self))]
    async fn query_history(
        &self,
        city: &str,
        days: RangeInclusive<NaiveDate>,
    ) -> Result<Vec<HistoricalRecord>> {
        let store = self.store.clone();
        let keys: Vec<String> = days
            .start()
            .iter_days()
            .take_while(|day| day <= days.end())
            .map(|day| SummaryKey::new(city, day).to_storage_key())
            .collect();

        let summaries = task::spawn_blocking(move || {
            let mut found = Vec::new();
            for key in keys {
                if let Some(summary) = get_from_store(&store, &key)? {
                    found.push(summary);
                }
            }
            anyhow::Ok(found)
        })
        .await
        .map_err(|e| WeatherWatchError::store(e.to_string()))?
        .map_err(|e| WeatherWatchError::store(format!("history scan failed: {e}")))?;

        tracing::debug!("Found {} stored days for {}", summaries.len(), city);
        Ok(summaries.into_iter().map(HistoricalRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    fn summary(city: &str, day: u32, count: u32) -> DailySummary {
        let mut summary = DailySummary::empty(&SummaryKey::new(city, date(day)));
        summary.count = count;
        summary.max_temp = 31.0;
        summary.conditions = vec!["Clear".to_string(); count as usize];
        summary.dominant_weather = Some("Clear".to_string());
        summary
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallSummaryStore::open(temp_dir.path()).unwrap();

        let stored = summary("Bangalore", 19, 3);
        store.put(&stored).await.unwrap();

        let loaded = store.get(&stored.key()).await.unwrap();
        assert_eq!(loaded, Some(stored));
        assert!(
            store
                .get(&SummaryKey::new("Bangalore", date(20)))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_query_history() {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallSummaryStore::open(temp_dir.path()).unwrap();

        store.put(&summary("Bangalore", 17, 1)).await.unwrap();
        store.put(&summary("Bangalore", 19, 2)).await.unwrap();
        store.put(&summary("Chennai", 18, 1)).await.unwrap();

        let records = store.query_history("Bangalore", date(16)..=date(19)).await.unwrap();
        let days: Vec<NaiveDate> = records.iter().map(HistoricalRecord::day).collect();
        assert_eq!(days, vec![date(17), date(19)]);

        let records = store.query_history("Bangalore", date(1)..=date(10)).await.unwrap();
        assert!(records.is_empty());
    }
}
