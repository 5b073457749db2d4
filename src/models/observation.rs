//! Instantaneous weather observation as delivered by a source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, WeatherWatchError};

/// One reading for one city, consumed immediately by aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub city: String,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Visibility in meters
    pub visibility: f64,
    /// Provider condition label, e.g. "Clouds"
    pub condition: String,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    /// Reject readings that must never reach the aggregator.
    ///
    /// Every number has to be finite, humidity, wind speed and visibility
    /// cannot be negative, and both the city and the condition label must be
    /// non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.city.trim().is_empty() {
            return Err(WeatherWatchError::invalid_observation(
                &self.city,
                "city cannot be empty",
            ));
        }
        if self.condition.trim().is_empty() {
            return Err(WeatherWatchError::invalid_observation(
                &self.city,
                "condition label cannot be empty",
            ));
        }

        let fields = [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("wind_speed", self.wind_speed),
            ("visibility", self.visibility),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(WeatherWatchError::invalid_observation(
                    &self.city,
                    format!("{name} is not a finite number: {value}"),
                ));
            }
        }

        for (name, value) in &fields[1..] {
            if *value < 0.0 {
                return Err(WeatherWatchError::invalid_observation(
                    &self.city,
                    format!("{name} cannot be negative: {value}"),
                ));
            }
        }

        Ok(())
    }
}
