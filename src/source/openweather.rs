//! OpenWeatherMap current-weather client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, instrument, warn};

use super::ObservationSource;
use crate::config::SourceConfig;
use crate::error::SourceFailure;
use crate::models::Observation;
use crate::{Result, WeatherWatchError};

/// Visibility OpenWeatherMap omits when it is unlimited, in meters
const DEFAULT_VISIBILITY_M: f64 = 10_000.0;

pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| WeatherWatchError::config("OpenWeatherMap API key is not set"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("WeatherWatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherWatchError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, city: &str) -> RequestBuilder {
        self.client.get(format!("{}/weather", self.base_url)).query(&[
            ("q", city),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ])
    }
}

/// The request URL carries the API key, so it is stripped before formatting.
fn transport_error(city: &str, err: reqwest::Error) -> WeatherWatchError {
    let failure = if err.is_timeout() {
        SourceFailure::Timeout
    } else {
        SourceFailure::Upstream
    };
    WeatherWatchError::source_unavailable(city, failure, err.without_url().to_string())
}

#[async_trait]
impl ObservationSource for OpenWeatherClient {
    #[instrument(name = "fetch_observation", skip(self))]
    async fn fetch(&self, city: &str) -> Result<Observation> {
        let start_time = Instant::now();

        let response = self
            .request(city)
            .send()
            .await
            .map_err(|e| transport_error(city, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WeatherWatchError::source_unavailable(
                city,
                SourceFailure::NotFound,
                "city not known to OpenWeatherMap",
            ));
        }
        if !status.is_success() {
            return Err(WeatherWatchError::source_unavailable(
                city,
                SourceFailure::Upstream,
                format!("OpenWeatherMap answered {status}"),
            ));
        }

        let body = response.bytes().await.map_err(|e| transport_error(city, e))?;
        let observation = parse_observation(city, &body, Utc::now())?;

        let elapsed = start_time.elapsed();
        debug!("Fetched observation in {:.3}s", elapsed.as_secs_f64());
        if elapsed.as_secs() > 5 {
            warn!("Slow weather API response: {:.3}s", elapsed.as_secs_f64());
        }
        Ok(observation)
    }
}

/// Decode a `/weather` payload into a validated observation.
///
/// `fallback_time` is used when the payload carries no `dt`.
pub fn parse_observation(city: &str, body: &[u8], fallback_time: DateTime<Utc>) -> Result<Observation> {
    let response: payload::CurrentWeatherResponse = serde_json::from_slice(body)
        .map_err(|e| WeatherWatchError::invalid_observation(city, format!("malformed payload: {e}")))?;

    let condition = response
        .weather
        .first()
        .map(|w| w.main.clone())
        .ok_or_else(|| WeatherWatchError::invalid_observation(city, "no weather condition reported"))?;

    let observed_at = response
        .dt
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt, 0))
        .unwrap_or(fallback_time);

    let observation = Observation {
        city: city.to_string(),
        temperature: response.main.temp,
        humidity: response.main.humidity,
        wind_speed: response.wind.map_or(0.0, |w| w.speed),
        visibility: response.visibility.unwrap_or(DEFAULT_VISIBILITY_M),
        condition,
        observed_at,
    };
    observation.validate()?;
    Ok(observation)
}

/// OpenWeatherMap API response structures
mod payload {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct CurrentWeatherResponse {
        pub main: MainData,
        pub wind: Option<WindData>,
        /// Meters, capped at 10 km by the provider
        pub visibility: Option<f64>,
        pub weather: Vec<ConditionData>,
        /// Unix seconds of the measurement
        pub dt: Option<i64>,
    }

    #[derive(Debug, Deserialize)]
    pub struct MainData {
        pub temp: f64,
        pub humidity: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct WindData {
        pub speed: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct ConditionData {
        pub main: String,
    }
}
