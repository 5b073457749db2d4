//! Incremental per-(city, day) aggregation

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;
use tracing::{debug, instrument};

use super::dominant;
use crate::models::{DailySummary, Observation, SummaryKey};
use crate::store::SummaryStore;
use crate::{Result, WeatherWatchError};

/// Folds one observation into a summary.
///
/// An empty summary (`count == 0`) is initialised from the observation;
/// otherwise the running extremes, totals and label sequence are extended and
/// every derived field is recomputed from the totals. `alert_triggered`
/// reflects this observation's temperature, not the day's maximum.
#[must_use]
pub fn fold(mut summary: DailySummary, observation: &Observation, alert_threshold: f64) -> DailySummary {
    let temp = observation.temperature;

    if summary.is_empty() {
        summary.min_temp = temp;
        summary.max_temp = temp;
    } else {
        summary.min_temp = summary.min_temp.min(temp);
        summary.max_temp = summary.max_temp.max(temp);
    }

    summary.count += 1;
    summary.total_temp += temp;
    summary.total_humidity += observation.humidity;
    summary.total_wind_speed += observation.wind_speed;
    summary.total_visibility += observation.visibility;
    summary.conditions.push(observation.condition.clone());

    let count = f64::from(summary.count);
    // Rounding in the running total may push the mean an ulp outside the extremes.
    summary.avg_temp = (summary.total_temp / count).clamp(summary.min_temp, summary.max_temp);
    summary.avg_humidity = summary.total_humidity / count;
    summary.avg_wind_speed = summary.total_wind_speed / count;
    summary.avg_visibility = summary.total_visibility / count;

    summary.dominant_weather = dominant::resolve(&summary.conditions).map(str::to_string);
    summary.alert_triggered = temp > alert_threshold;
    summary.last_observed_at = Some(observation.observed_at);

    summary
}

/// One async lock per summary key
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<SummaryKey, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    fn get(&self, key: &SummaryKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Locks for past days are no longer needed once nobody holds them.
        locks.retain(|k, lock| k.day >= key.day || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Applies observations to stored daily summaries.
///
/// Updates of the same (city, day) are serialised in arrival order through a
/// per-key lock; different keys never contend. Each read-modify-write runs in
/// its own task that keeps the key locked until the store has answered, so a
/// caller that gives up after `store_timeout` cannot let a later update
/// overtake a write that is still in flight.
///
/// Once the caller has timed out the task abandons the update unless its
/// `put` has already started. Only a `put` already handed to the store can
/// still land after the caller saw `Store`.
pub struct DailyAggregator {
    store: Arc<dyn SummaryStore>,
    locks: KeyedLocks,
    alert_threshold: f64,
    store_timeout: Duration,
}

impl DailyAggregator {
    pub fn new(store: Arc<dyn SummaryStore>, alert_threshold: f64, store_timeout: Duration) -> Self {
        Self {
            store,
            locks: KeyedLocks::default(),
            alert_threshold,
            store_timeout,
        }
    }

    /// Fold `observation` into the summary for `(city, day)` and persist it.
    ///
    /// The returned summary is what the store now holds. On error nothing
    /// should be assumed applied.
    #[instrument(name = "aggregate_observation", level = "debug", skip(self, observation), fields(temp = observation.temperature))]
    pub async fn update(&self, city: &str, day: NaiveDate, observation: Observation) -> Result<DailySummary> {
        if city.trim().is_empty() {
            return Err(WeatherWatchError::invalid_observation(city, "city cannot be empty"));
        }
        observation.validate()?;

        let key = SummaryKey::new(city, day);
        let lock = self.locks.get(&key);
        let store = Arc::clone(&self.store);
        let threshold = self.alert_threshold;
        let abandoned = Arc::new(AtomicBool::new(false));
        let task_abandoned = Arc::clone(&abandoned);

        let write = tokio::spawn(async move {
            let _guard = lock.lock_owned().await;
            let current = store.get_or_create(&key).await?;
            if task_abandoned.load(Ordering::SeqCst) {
                debug!(%key, "Caller timed out, dropping update");
                return Err(WeatherWatchError::store(format!("update of {key} abandoned")));
            }
            let updated = fold(current, &observation, threshold);
            store.put(&updated).await?;
            Ok::<_, WeatherWatchError>(updated)
        });

        let outcome = timeout(self.store_timeout, write).await;
        if outcome.is_err() {
            abandoned.store(true, Ordering::SeqCst);
        }
        match outcome {
            Ok(Ok(result)) => {
                if let Ok(summary) = &result {
                    debug!(count = summary.count, max_temp = summary.max_temp, "Summary updated");
                }
                result
            }
            Ok(Err(join_error)) => Err(WeatherWatchError::store(format!(
                "aggregation task failed: {join_error}"
            ))),
            Err(_) => Err(WeatherWatchError::store(format!(
                "store did not respond within {:?}",
                self.store_timeout
            ))),
        }
    }
}
