//! High-temperature alert confirmation.
//!
//! The aggregator's `alert_triggered` flag follows every single reading. This
//! module layers hysteresis on top: a city only reports an alert once the
//! day's persisted maximum has exceeded the threshold on `confirmation`
//! consecutive evaluations. Any evaluation at or below the threshold resets
//! the city to [`AlertLevel::Normal`].
//!
//! Breach counters live in memory only. A restart puts every city back to
//! `Normal`, so a city already in breach needs `confirmation` fresh polls
//! before it reports again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// No breach on the latest evaluation
    Normal,
    /// In breach, not yet confirmed
    Watch,
    /// In breach for at least `confirmation` consecutive evaluations
    Confirmed,
}

/// Per-city breach counter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    pub consecutive_breaches: u32,
    pub last_max_temp: Option<f64>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

/// What a caller gets to see for one city
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertStatus {
    pub city: String,
    pub level: AlertLevel,
    #[serde(rename = "alertTriggered")]
    pub alert_triggered: bool,
    pub consecutive_breaches: u32,
    pub max_temp: Option<f64>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

pub struct AlertEvaluator {
    threshold: f64,
    confirmation: u32,
    states: Mutex<HashMap<String, Arc<Mutex<AlertState>>>>,
}

impl AlertEvaluator {
    /// `confirmation` below 1 is treated as 1.
    #[must_use]
    pub fn new(threshold: f64, confirmation: u32) -> Self {
        Self {
            threshold,
            confirmation: confirmation.max(1),
            states: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn confirmation(&self) -> u32 {
        self.confirmation
    }

    fn state_for(&self, city: &str) -> Arc<Mutex<AlertState>> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(states.entry(city.to_string()).or_default())
    }

    fn level(&self, breaches: u32) -> AlertLevel {
        match breaches {
            0 => AlertLevel::Normal,
            n if n >= self.confirmation => AlertLevel::Confirmed,
            _ => AlertLevel::Watch,
        }
    }

    fn status(&self, city: &str, state: &AlertState) -> AlertStatus {
        let level = self.level(state.consecutive_breaches);
        AlertStatus {
            city: city.to_string(),
            level,
            alert_triggered: level == AlertLevel::Confirmed,
            consecutive_breaches: state.consecutive_breaches,
            max_temp: state.last_max_temp,
            evaluated_at: state.last_evaluated_at,
        }
    }

    /// Advance the city's state with the day's persisted maximum temperature.
    pub fn evaluate(&self, city: &str, max_temp: f64, at: DateTime<Utc>) -> AlertStatus {
        let state = self.state_for(city);
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);

        let was_confirmed = self.level(state.consecutive_breaches) == AlertLevel::Confirmed;
        if max_temp > self.threshold {
            state.consecutive_breaches = state.consecutive_breaches.saturating_add(1);
        } else {
            state.consecutive_breaches = 0;
        }
        state.last_max_temp = Some(max_temp);
        state.last_evaluated_at = Some(at);

        let status = self.status(city, &state);
        if status.level == AlertLevel::Confirmed && !was_confirmed {
            warn!(
                city,
                max_temp,
                threshold = self.threshold,
                "High temperature alert for {}",
                city
            );
        } else if status.level == AlertLevel::Normal && was_confirmed {
            debug!(city, max_temp, "Temperature alert cleared for {}", city);
        }
        status
    }

    /// Current state without advancing it. Cities never evaluated are `Normal`.
    #[must_use]
    pub fn current(&self, city: &str) -> AlertStatus {
        let existing = {
            let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
            states.get(city).cloned()
        };
        match existing {
            Some(state) => {
                let state = state.lock().unwrap_or_else(PoisonError::into_inner);
                self.status(city, &state)
            }
            None => self.status(city, &AlertState::default()),
        }
    }
}
