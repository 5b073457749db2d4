//! Periodic observation polling.
//!
//! One timer drives ticks. Every tick computes the day key once from the
//! clock, then polls each configured city in its own task: fetch (bounded by
//! `fetch_timeout`), validate, aggregate, evaluate alerts. A failing city is
//! logged and skipped without touching the others or its stored summary.
//!
//! A tick waits for all its city tasks before the timer is consulted again,
//! and missed timer ticks are skipped, so ticks never overlap. Stopping the
//! poller takes effect between ticks; an in-flight tick runs to completion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, timeout};
use tracing::{debug, info, instrument, warn};

use crate::aggregation::DailyAggregator;
use crate::alert::{AlertEvaluator, AlertStatus};
use crate::clock::{Clock, day_in};
use crate::error::SourceFailure;
use crate::models::DailySummary;
use crate::source::ObservationSource;
use crate::{Result, WeatherWatchError};

/// Outcome of one city in one tick
#[derive(Debug)]
pub enum CityOutcome {
    Updated {
        summary: DailySummary,
        alert: AlertStatus,
    },
    Skipped(WeatherWatchError),
}

#[derive(Debug)]
pub struct TickReport {
    pub day: NaiveDate,
    pub outcomes: Vec<(String, CityOutcome)>,
}

impl TickReport {
    pub fn updated(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|(city, outcome)| match outcome {
            CityOutcome::Updated { .. } => Some(city.as_str()),
            CityOutcome::Skipped(_) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &WeatherWatchError)> {
        self.outcomes.iter().filter_map(|(city, outcome)| match outcome {
            CityOutcome::Skipped(err) => Some((city.as_str(), err)),
            CityOutcome::Updated { .. } => None,
        })
    }

    #[must_use]
    pub fn outcome(&self, city: &str) -> Option<&CityOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == city)
            .map(|(_, outcome)| outcome)
    }
}

pub struct Poller {
    cities: Vec<String>,
    interval: Duration,
    fetch_timeout: Duration,
    timezone: Tz,
    source: Arc<dyn ObservationSource>,
    aggregator: Arc<DailyAggregator>,
    evaluator: Arc<AlertEvaluator>,
    clock: Arc<dyn Clock>,
    last_success: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Poller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cities: Vec<String>,
        interval: Duration,
        fetch_timeout: Duration,
        timezone: Tz,
        source: Arc<dyn ObservationSource>,
        aggregator: Arc<DailyAggregator>,
        evaluator: Arc<AlertEvaluator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cities,
            interval,
            fetch_timeout,
            timezone,
            source,
            aggregator,
            evaluator,
            clock,
            last_success: Mutex::new(HashMap::new()),
        }
    }

    /// When `city` last completed a poll end to end
    #[must_use]
    pub fn last_success(&self, city: &str) -> Option<DateTime<Utc>> {
        self.last_success
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(city)
            .copied()
    }

    /// Poll every city once.
    #[instrument(name = "poll_tick", skip(self))]
    pub async fn tick(self: &Arc<Self>) -> TickReport {
        let day = day_in(self.clock.now(), self.timezone);
        let mut tasks = JoinSet::new();

        for city in &self.cities {
            let poller = Arc::clone(self);
            let city = city.clone();
            tasks.spawn(async move {
                let outcome = match poller.poll_city(&city, day).await {
                    Ok((summary, alert)) => CityOutcome::Updated { summary, alert },
                    Err(err) => {
                        warn!(city = %city, "Skipping city this tick: {}", err);
                        CityOutcome::Skipped(err)
                    }
                };
                (city, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(self.cities.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => outcomes.push(result),
                Err(e) => warn!("City poll task failed: {}", e),
            }
        }
        // Report in configuration order, not completion order
        outcomes.sort_by_key(|(city, _)| self.cities.iter().position(|c| c == city));

        let report = TickReport { day, outcomes };
        info!(
            %day,
            updated = report.updated().count(),
            skipped = report.skipped().count(),
            "Poll tick finished"
        );
        report
    }

    async fn poll_city(&self, city: &str, day: NaiveDate) -> Result<(DailySummary, AlertStatus)> {
        let observation = match timeout(self.fetch_timeout, self.source.fetch(city)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(WeatherWatchError::source_unavailable(
                    city,
                    SourceFailure::Timeout,
                    format!("no observation within {:?}", self.fetch_timeout),
                ));
            }
        };
        observation.validate()?;
        debug!(city, temp = observation.temperature, "Observation received");

        let summary = self.aggregator.update(city, day, observation).await?;
        let alert = self.evaluator.evaluate(city, summary.max_temp, self.clock.now());

        self.last_success
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(city.to_string(), self.clock.now());

        Ok((summary, alert))
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            cities = self.cities.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Poller started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Poller stopped");
    }

    /// Start [`Poller::run`] on the runtime.
    pub fn spawn(self: Arc<Self>) -> PollerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(self.run(receiver));
        PollerHandle { shutdown, task }
    }
}

pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the poller and wait for the current tick to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Poller task ended abnormally: {}", e);
        }
    }
}
