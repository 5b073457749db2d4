//! Data models for the WeatherWatch service
//!
//! - Observation: a single instantaneous reading from the weather source
//! - Summary: per-city, per-day running statistics and their history view

pub mod observation;
pub mod summary;

// Re-export all public types for convenient access
pub use observation::Observation;
pub use summary::{DailySummary, HistoricalRecord, SummaryKey};
