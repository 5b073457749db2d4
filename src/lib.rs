//! `WeatherWatch` - daily weather aggregation and high-temperature alerting
//!
//! This library polls a weather source for a fixed set of cities, folds every
//! reading into a persisted per-day summary and confirms temperature alerts
//! across consecutive polls.

pub mod aggregation;
pub mod alert;
pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod poller;
pub mod service;
pub mod source;
pub mod store;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use aggregation::DailyAggregator;
pub use alert::{AlertEvaluator, AlertLevel, AlertStatus};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::WeatherWatchConfig;
pub use error::{SourceFailure, WeatherWatchError};
pub use models::{DailySummary, HistoricalRecord, Observation, SummaryKey};
pub use poller::{CityOutcome, Poller, PollerHandle, TickReport};
pub use service::WeatherService;
pub use source::{ObservationSource, OpenWeatherClient};
pub use store::{FjallSummaryStore, InMemorySummaryStore, SummaryStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherWatchError>;
