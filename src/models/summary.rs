//! Daily summary records and their storage key

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one summary: a city on a calendar day in the reference timezone
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SummaryKey {
    pub city: String,
    pub day: NaiveDate,
}

impl SummaryKey {
    pub fn new(city: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            city: city.into(),
            day,
        }
    }

    /// Byte key used by the persistent store, e.g. `Delhi/2024-10-19`
    #[must_use]
    pub fn to_storage_key(&self) -> String {
        format!("{}/{}", self.city, self.day.format("%Y-%m-%d"))
    }
}

impl fmt::Display for SummaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.city, self.day)
    }
}

/// Running statistics for one city on one day.
///
/// A fresh summary has every number at zero and `count == 0`; the aggregator
/// treats that as "not yet observed". Averages are derived from the running
/// totals and never written on their own. `avg_temp` is additionally clamped
/// to `[min_temp, max_temp]`, so it may differ from `total_temp / count` by
/// rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub city: String,
    pub day: NaiveDate,
    pub count: u32,
    pub min_temp: f64,
    pub max_temp: f64,
    pub avg_temp: f64,
    pub total_temp: f64,
    pub total_humidity: f64,
    pub total_wind_speed: f64,
    pub total_visibility: f64,
    pub avg_humidity: f64,
    pub avg_wind_speed: f64,
    pub avg_visibility: f64,
    /// Every condition label seen today, in arrival order
    pub conditions: Vec<String>,
    pub dominant_weather: Option<String>,
    /// Threshold check of the most recent observation only
    pub alert_triggered: bool,
    pub last_observed_at: Option<DateTime<Utc>>,
}

impl DailySummary {
    /// Zero-valued summary for a key that has no observation yet
    #[must_use]
    pub fn empty(key: &SummaryKey) -> Self {
        Self {
            city: key.city.clone(),
            day: key.day,
            count: 0,
            min_temp: 0.0,
            max_temp: 0.0,
            avg_temp: 0.0,
            total_temp: 0.0,
            total_humidity: 0.0,
            total_wind_speed: 0.0,
            total_visibility: 0.0,
            avg_humidity: 0.0,
            avg_wind_speed: 0.0,
            avg_visibility: 0.0,
            conditions: Vec::new(),
            dominant_weather: None,
            alert_triggered: false,
            last_observed_at: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> SummaryKey {
        SummaryKey::new(self.city.clone(), self.day)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Read-only snapshot of a day's summary, returned by history queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRecord {
    summary: DailySummary,
}

impl HistoricalRecord {
    #[must_use]
    pub fn summary(&self) -> &DailySummary {
        &self.summary
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.summary.city
    }

    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.summary.day
    }
}

impl From<DailySummary> for HistoricalRecord {
    fn from(summary: DailySummary) -> Self {
        Self { summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_format() {
        let key = SummaryKey::new("Delhi", NaiveDate::from_ymd_opt(2024, 10, 9).unwrap());
        assert_eq!(key.to_storage_key(), "Delhi/2024-10-09");
        assert_eq!(key.to_string(), "Delhi on 2024-10-09");
    }

    #[test]
    fn test_empty_summary_is_zeroed() {
        let key = SummaryKey::new("Mumbai", NaiveDate::from_ymd_opt(2024, 10, 19).unwrap());
        let summary = DailySummary::empty(&key);
        assert!(summary.is_empty());
        assert_eq!(summary.total_temp, 0.0);
        assert!(summary.conditions.is_empty());
        assert!(summary.dominant_weather.is_none());
        assert_eq!(summary.key(), key);
    }

    #[test]
    fn test_historical_record_exposes_summary() {
        let key = SummaryKey::new("Chennai", NaiveDate::from_ymd_opt(2024, 10, 19).unwrap());
        let record = HistoricalRecord::from(DailySummary::empty(&key));
        assert_eq!(record.city(), "Chennai");
        assert_eq!(record.day(), key.day);
        assert_eq!(record.summary().count, 0);
    }
}
