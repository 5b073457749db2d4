//! Error types and handling for `WeatherWatch`

use std::fmt;

use thiserror::Error;

/// Why the upstream observation source could not deliver a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFailure {
    /// The provider does not know the requested city
    NotFound,
    /// The request did not complete within the configured timeout
    Timeout,
    /// Any other transport or provider-side failure
    Upstream,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFailure::NotFound => write!(f, "not found"),
            SourceFailure::Timeout => write!(f, "timeout"),
            SourceFailure::Upstream => write!(f, "upstream error"),
        }
    }
}

/// Main error type for the `WeatherWatch` service
#[derive(Error, Debug)]
pub enum WeatherWatchError {
    /// The observation source failed or timed out
    #[error("Weather source unavailable for {city} ({failure}): {message}")]
    SourceUnavailable {
        city: String,
        failure: SourceFailure,
        message: String,
    },

    /// The source returned a payload that cannot enter aggregation
    #[error("Invalid observation for {city}: {message}")]
    InvalidObservation { city: String, message: String },

    /// Summary store get/put failed or timed out
    #[error("Store error: {message}")]
    Store { message: String },

    /// Historical query failed
    #[error("History query failed: {message}")]
    HistoryQuery { message: String },

    /// City is not part of the configured set
    #[error("Unknown city: {city}")]
    UnknownCity { city: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WeatherWatchError {
    /// Create a new source error
    pub fn source_unavailable<C: Into<String>, M: Into<String>>(
        city: C,
        failure: SourceFailure,
        message: M,
    ) -> Self {
        Self::SourceUnavailable {
            city: city.into(),
            failure,
            message: message.into(),
        }
    }

    /// Create a new invalid observation error
    pub fn invalid_observation<C: Into<String>, M: Into<String>>(city: C, message: M) -> Self {
        Self::InvalidObservation {
            city: city.into(),
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn history_query<S: Into<String>>(message: S) -> Self {
        Self::HistoryQuery {
            message: message.into(),
        }
    }

    pub fn unknown_city<S: Into<String>>(city: S) -> Self {
        Self::UnknownCity { city: city.into() }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherWatchError::SourceUnavailable { city, failure, .. } => match failure {
                SourceFailure::NotFound => format!("No weather data is available for {city}."),
                SourceFailure::Timeout => {
                    format!("The weather provider did not answer in time for {city}.")
                }
                SourceFailure::Upstream => {
                    "Unable to reach the weather provider. Please try again later.".to_string()
                }
            },
            WeatherWatchError::InvalidObservation { city, .. } => {
                format!("The weather provider returned unusable data for {city}.")
            }
            WeatherWatchError::Store { .. } => {
                "Summary storage is currently unavailable.".to_string()
            }
            WeatherWatchError::HistoryQuery { .. } => {
                "Historical data could not be loaded.".to_string()
            }
            WeatherWatchError::UnknownCity { city } => {
                format!("{city} is not a monitored city.")
            }
            WeatherWatchError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            WeatherWatchError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
