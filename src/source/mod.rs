//! Observation source adapters

use async_trait::async_trait;

use crate::Result;
use crate::models::Observation;

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// Something that can report the current weather of a named city.
///
/// Failures are reported as `WeatherWatchError::SourceUnavailable` (not
/// found, timeout, upstream) or `WeatherWatchError::InvalidObservation` when a
/// payload arrived but cannot be used.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn fetch(&self, city: &str) -> Result<Observation>;
}
