//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use weatherwatch::{
    AlertEvaluator, DailyAggregator, FixedClock, InMemorySummaryStore, Observation,
    ObservationSource, Poller, Result, SourceFailure, WeatherService, WeatherWatchError,
};

pub const CITIES: [&str; 3] = ["Delhi", "Mumbai", "Chennai"];

/// Replies with whatever was last scripted for a city; unscripted cities fail
#[derive(Default)]
pub struct ScriptedSource {
    readings: Mutex<HashMap<String, std::result::Result<(f64, String), SourceFailure>>>,
}

impl ScriptedSource {
    pub fn set(&self, city: &str, temperature: f64, condition: &str) {
        self.readings
            .lock()
            .unwrap()
            .insert(city.to_string(), Ok((temperature, condition.to_string())));
    }

    pub fn fail(&self, city: &str, failure: SourceFailure) {
        self.readings
            .lock()
            .unwrap()
            .insert(city.to_string(), Err(failure));
    }
}

#[async_trait]
impl ObservationSource for ScriptedSource {
    async fn fetch(&self, city: &str) -> Result<Observation> {
        let scripted = self.readings.lock().unwrap().get(city).cloned();
        match scripted {
            Some(Ok((temperature, condition))) => Ok(Observation {
                city: city.to_string(),
                temperature,
                humidity: 60.0,
                wind_speed: 3.0,
                visibility: 10_000.0,
                condition,
                observed_at: Utc::now(),
            }),
            Some(Err(failure)) => Err(WeatherWatchError::source_unavailable(
                city, failure, "scripted",
            )),
            None => Err(WeatherWatchError::source_unavailable(
                city,
                SourceFailure::NotFound,
                "not scripted",
            )),
        }
    }
}

pub struct Harness {
    pub source: Arc<ScriptedSource>,
    pub store: Arc<InMemorySummaryStore>,
    pub clock: Arc<FixedClock>,
    pub poller: Arc<Poller>,
    pub service: Arc<WeatherService>,
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Three cities, threshold 35 °C, Asia/Kolkata days, clock at 2024-10-19 10:00 IST
pub fn harness(confirmation: u32) -> Harness {
    let source = Arc::new(ScriptedSource::default());
    let store = Arc::new(InMemorySummaryStore::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 10, 19, 4, 30, 0).unwrap(),
    ));
    let evaluator = Arc::new(AlertEvaluator::new(35.0, confirmation));
    let aggregator = Arc::new(DailyAggregator::new(
        store.clone(),
        35.0,
        Duration::from_secs(5),
    ));
    let cities: Vec<String> = CITIES.iter().map(|c| c.to_string()).collect();
    let timezone = chrono_tz::Asia::Kolkata;

    let poller = Arc::new(Poller::new(
        cities.clone(),
        Duration::from_secs(300),
        Duration::from_secs(2),
        timezone,
        source.clone(),
        aggregator,
        evaluator.clone(),
        clock.clone(),
    ));
    let service = Arc::new(WeatherService::new(
        cities,
        timezone,
        Duration::from_secs(2),
        366,
        source.clone(),
        store.clone(),
        evaluator,
        clock.clone(),
    ));

    Harness {
        source,
        store,
        clock,
        poller,
        service,
    }
}
