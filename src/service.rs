//! Read-side queries over the monitored cities.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use chrono_tz::Tz;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::alert::{AlertEvaluator, AlertStatus};
use crate::clock::Clock;
use crate::error::SourceFailure;
use crate::models::{DailySummary, HistoricalRecord, Observation, SummaryKey};
use crate::source::ObservationSource;
use crate::store::SummaryStore;
use crate::{Result, WeatherWatchError};

pub struct WeatherService {
    cities: Vec<String>,
    timezone: Tz,
    fetch_timeout: Duration,
    history_max_days: u32,
    source: Arc<dyn ObservationSource>,
    store: Arc<dyn SummaryStore>,
    evaluator: Arc<AlertEvaluator>,
    clock: Arc<dyn Clock>,
}

impl WeatherService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cities: Vec<String>,
        timezone: Tz,
        fetch_timeout: Duration,
        history_max_days: u32,
        source: Arc<dyn ObservationSource>,
        store: Arc<dyn SummaryStore>,
        evaluator: Arc<AlertEvaluator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cities,
            timezone,
            fetch_timeout,
            history_max_days,
            source,
            store,
            evaluator,
            clock,
        }
    }

    #[must_use]
    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today(self.timezone)
    }

    /// Canonical configured name for `city`, matched case-insensitively.
    pub fn resolve_city(&self, city: &str) -> Result<&str> {
        let wanted = city.trim();
        self.cities
            .iter()
            .find(|c| c.eq_ignore_ascii_case(wanted))
            .map(String::as_str)
            .ok_or_else(|| WeatherWatchError::unknown_city(city))
    }

    /// Live reading from the source. Does not touch the stored summary.
    #[instrument(skip(self))]
    pub async fn get_current_observation(&self, city: &str) -> Result<Observation> {
        let city = self.resolve_city(city)?;
        let observation = timeout(self.fetch_timeout, self.source.fetch(city))
            .await
            .map_err(|_| {
                WeatherWatchError::source_unavailable(
                    city,
                    SourceFailure::Timeout,
                    format!("no observation within {:?}", self.fetch_timeout),
                )
            })??;
        observation.validate()?;
        Ok(observation)
    }

    /// Today's summary, or `None` before the first successful poll of the day.
    #[instrument(skip(self))]
    pub async fn get_today_summary(&self, city: &str) -> Result<Option<DailySummary>> {
        let city = self.resolve_city(city)?;
        let key = SummaryKey::new(city, self.today());
        let summary = self.store.get(&key).await?;
        Ok(summary.filter(|s| !s.is_empty()))
    }

    /// Confirmed alert state as of the latest poll
    pub fn get_alert_status(&self, city: &str) -> Result<AlertStatus> {
        let city = self.resolve_city(city)?;
        Ok(self.evaluator.current(city))
    }

    /// Stored summaries from `start` through today, oldest first.
    ///
    /// `start` is clamped to `history_max_days` before today. A start after
    /// today yields an empty list.
    #[instrument(skip(self))]
    pub async fn get_history(&self, city: &str, start: NaiveDate) -> Result<Vec<HistoricalRecord>> {
        let city = self.resolve_city(city)?;
        let today = self.today();
        if start > today {
            return Ok(Vec::new());
        }

        let earliest = today
            .checked_sub_days(Days::new(self.history_max_days.into()))
            .unwrap_or(NaiveDate::MIN);
        let start = start.max(earliest);
        debug!(%start, %today, "Querying history");

        let records = self
            .store
            .query_history(city, start..=today)
            .await
            .map_err(|e| WeatherWatchError::history_query(e.to_string()))?;
        Ok(records.into_iter().filter(|r| !r.summary().is_empty()).collect())
    }
}
