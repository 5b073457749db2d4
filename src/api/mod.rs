use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::alert::{AlertLevel, AlertStatus};
use crate::error::SourceFailure;
use crate::models::{DailySummary, HistoricalRecord, Observation};
use crate::service::WeatherService;
use crate::WeatherWatchError;

type SharedService = Arc<WeatherService>;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiObservation {
    pub city: String,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub visibility: f64,
    pub condition: String,
    pub observed_at: DateTime<Utc>,
}

impl From<Observation> for ApiObservation {
    fn from(obs: Observation) -> Self {
        Self {
            city: obs.city,
            temperature: obs.temperature,
            humidity: obs.humidity,
            wind_speed: obs.wind_speed,
            visibility: obs.visibility,
            condition: obs.condition,
            observed_at: obs.observed_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSummary {
    pub city: String,
    pub date: NaiveDate,
    pub count: u32,
    pub min_temp: f64,
    pub max_temp: f64,
    pub avg_temp: f64,
    pub avg_humidity: f64,
    pub avg_wind_speed: f64,
    pub avg_visibility: f64,
    pub dominant_weather: Option<String>,
    pub alert_triggered: bool,
    pub last_observed_at: Option<DateTime<Utc>>,
}

impl From<&DailySummary> for ApiSummary {
    fn from(s: &DailySummary) -> Self {
        Self {
            city: s.city.clone(),
            date: s.day,
            count: s.count,
            min_temp: s.min_temp,
            max_temp: s.max_temp,
            avg_temp: s.avg_temp,
            avg_humidity: s.avg_humidity,
            avg_wind_speed: s.avg_wind_speed,
            avg_visibility: s.avg_visibility,
            dominant_weather: s.dominant_weather.clone(),
            alert_triggered: s.alert_triggered,
            last_observed_at: s.last_observed_at,
        }
    }
}

impl From<&HistoricalRecord> for ApiSummary {
    fn from(record: &HistoricalRecord) -> Self {
        Self::from(record.summary())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAlert {
    pub city: String,
    pub alert_triggered: bool,
    pub level: String,
    pub consecutive_breaches: u32,
    pub max_temp: Option<f64>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl From<AlertStatus> for ApiAlert {
    fn from(status: AlertStatus) -> Self {
        Self {
            city: status.city,
            alert_triggered: status.alert_triggered,
            level: match status.level {
                AlertLevel::Normal => "normal".to_string(),
                AlertLevel::Watch => "watch".to_string(),
                AlertLevel::Confirmed => "confirmed".to_string(),
            },
            consecutive_breaches: status.consecutive_breaches,
            max_temp: status.max_temp,
            evaluated_at: status.evaluated_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub start_date: Option<String>,
}

/// Error body returned by every failing route
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<WeatherWatchError> for ApiError {
    fn from(err: WeatherWatchError) -> Self {
        let status = match &err {
            WeatherWatchError::UnknownCity { .. } => StatusCode::NOT_FOUND,
            WeatherWatchError::SourceUnavailable { failure, .. } => match failure {
                SourceFailure::NotFound => StatusCode::NOT_FOUND,
                SourceFailure::Timeout => StatusCode::GATEWAY_TIMEOUT,
                SourceFailure::Upstream => StatusCode::BAD_GATEWAY,
            },
            WeatherWatchError::InvalidObservation { .. } => StatusCode::BAD_GATEWAY,
            WeatherWatchError::Store { .. }
            | WeatherWatchError::HistoryQuery { .. }
            | WeatherWatchError::Config { .. }
            | WeatherWatchError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/cities", get(get_cities))
        .route("/current/{city}", get(get_current))
        .route("/summary/{city}", get(get_summary))
        .route("/alert/{city}", get(get_alert))
        .route("/history/{city}", get(get_history))
        .with_state(service)
}

async fn get_cities(State(service): State<SharedService>) -> Json<Vec<String>> {
    Json(service.cities().to_vec())
}

async fn get_current(
    State(service): State<SharedService>,
    Path(city): Path<String>,
) -> Result<Json<ApiObservation>, ApiError> {
    let observation = service.get_current_observation(&city).await?;
    Ok(Json(observation.into()))
}

async fn get_summary(
    State(service): State<SharedService>,
    Path(city): Path<String>,
) -> Result<Json<ApiSummary>, ApiError> {
    match service.get_today_summary(&city).await? {
        Some(summary) => Ok(Json(ApiSummary::from(&summary))),
        None => Err(ApiError::not_found(format!(
            "No observations recorded today for {city}."
        ))),
    }
}

async fn get_alert(
    State(service): State<SharedService>,
    Path(city): Path<String>,
) -> Result<Json<ApiAlert>, ApiError> {
    Ok(Json(service.get_alert_status(&city)?.into()))
}

async fn get_history(
    State(service): State<SharedService>,
    Path(city): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ApiSummary>>, ApiError> {
    let start = match params.start_date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request(format!("startDate must be YYYY-MM-DD, got {raw}")))?,
        None => service.today(),
    };
    let records = service.get_history(&city, start).await?;
    Ok(Json(records.iter().map(ApiSummary::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(WeatherWatchError::unknown_city("Paris"), StatusCode::NOT_FOUND)]
    #[case(
        WeatherWatchError::source_unavailable("Delhi", SourceFailure::NotFound, "404"),
        StatusCode::NOT_FOUND
    )]
    #[case(
        WeatherWatchError::source_unavailable("Delhi", SourceFailure::Timeout, "slow"),
        StatusCode::GATEWAY_TIMEOUT
    )]
    #[case(
        WeatherWatchError::source_unavailable("Delhi", SourceFailure::Upstream, "503"),
        StatusCode::BAD_GATEWAY
    )]
    #[case(WeatherWatchError::invalid_observation("Delhi", "NaN"), StatusCode::BAD_GATEWAY)]
    #[case(WeatherWatchError::store("disk full"), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(WeatherWatchError::history_query("scan failed"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_error_status(#[case] err: WeatherWatchError, #[case] expected: StatusCode) {
        assert_eq!(ApiError::from(err).status, expected);
    }

    #[test]
    fn test_alert_view_uses_camel_case() {
        let view = ApiAlert::from(AlertStatus {
            city: "Delhi".to_string(),
            level: AlertLevel::Confirmed,
            alert_triggered: true,
            consecutive_breaches: 2,
            max_temp: Some(36.5),
            evaluated_at: None,
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["alertTriggered"], true);
        assert_eq!(json["level"], "confirmed");
        assert_eq!(json["consecutiveBreaches"], 2);
    }
}
