//! End-to-end polling through aggregation, storage and alerting

mod common;

use chrono::{TimeZone, Utc};
use common::{day, harness};
use weatherwatch::{CityOutcome, SourceFailure, SummaryKey, SummaryStore};

/// Three polls for one city build the expected daily statistics
#[tokio::test]
async fn test_daily_summary_from_three_polls() {
    let h = harness(2);
    for (temp, condition) in [(30.0, "Clouds"), (34.0, "Rain"), (32.0, "Rain")] {
        h.source.set("Delhi", temp, condition);
        h.poller.tick().await;
    }

    let summary = h
        .service
        .get_today_summary("Delhi")
        .await
        .unwrap()
        .expect("summary after polling");
    assert_eq!(summary.count, 3);
    assert_eq!(summary.min_temp, 30.0);
    assert_eq!(summary.max_temp, 34.0);
    assert!((summary.avg_temp - 32.0).abs() < 1e-9);
    assert_eq!(summary.dominant_weather.as_deref(), Some("Rain"));
    assert!(!summary.alert_triggered);
}

/// A failing city is skipped; the others and its own summary are unaffected
#[tokio::test]
async fn test_failures_are_isolated_per_city() {
    let h = harness(2);
    h.source.set("Delhi", 30.0, "Clear");
    h.source.set("Mumbai", 29.0, "Haze");
    h.source.set("Chennai", 31.0, "Clouds");
    h.poller.tick().await;
    let chennai_before = h.service.get_today_summary("Chennai").await.unwrap();

    h.source.fail("Chennai", SourceFailure::Timeout);
    h.source.set("Delhi", 33.0, "Clear");
    let report = h.poller.tick().await;

    assert_eq!(report.updated().collect::<Vec<_>>(), vec!["Delhi", "Mumbai"]);
    let skipped: Vec<_> = report.skipped().map(|(city, _)| city).collect();
    assert_eq!(skipped, vec!["Chennai"]);
    assert_eq!(
        h.service.get_today_summary("Chennai").await.unwrap(),
        chennai_before
    );
    let delhi = h.service.get_today_summary("Delhi").await.unwrap().unwrap();
    assert_eq!(delhi.count, 2);
    assert_eq!(delhi.max_temp, 33.0);
}

/// The day key follows the reference timezone, not UTC
#[tokio::test]
async fn test_day_rollover_in_reference_timezone() {
    let h = harness(2);
    h.source.set("Delhi", 30.0, "Clear");
    h.poller.tick().await;

    // 00:01 IST on the 20th is still the 19th in UTC
    h.clock.set(Utc.with_ymd_and_hms(2024, 10, 19, 18, 31, 0).unwrap());
    let report = h.poller.tick().await;
    assert_eq!(report.day, day(2024, 10, 20));

    let first = h.store.get(&SummaryKey::new("Delhi", day(2024, 10, 19))).await.unwrap().unwrap();
    let second = h.store.get(&SummaryKey::new("Delhi", day(2024, 10, 20))).await.unwrap().unwrap();
    assert_eq!(first.count, 1);
    assert_eq!(second.count, 1);

    let history = h.service.get_history("Delhi", day(2024, 10, 1)).await.unwrap();
    let days: Vec<_> = history.iter().map(|r| r.day()).collect();
    assert_eq!(days, vec![day(2024, 10, 19), day(2024, 10, 20)]);
}

/// Temperatures 36, 20, 36, 36 with two confirmations alert only on the last poll
#[tokio::test]
async fn test_alert_needs_consecutive_breaches() {
    let h = harness(2);
    let mut seen = Vec::new();

    for (i, temp) in [36.0, 20.0, 36.0, 36.0].into_iter().enumerate() {
        // One day per reading so the day's maximum equals the reading
        h.clock.set(Utc.with_ymd_and_hms(2024, 10, 10 + i as u32, 6, 0, 0).unwrap());
        h.source.set("Delhi", temp, "Clear");
        h.poller.tick().await;
        seen.push(h.service.get_alert_status("Delhi").unwrap().alert_triggered);
    }

    assert_eq!(seen, vec![false, false, false, true]);
}

/// With a single confirmation every breaching poll alerts immediately
#[tokio::test]
async fn test_alert_with_single_confirmation() {
    let h = harness(1);
    let mut seen = Vec::new();

    for (i, temp) in [36.0, 20.0, 36.0, 36.0].into_iter().enumerate() {
        h.clock.set(Utc.with_ymd_and_hms(2024, 10, 10 + i as u32, 6, 0, 0).unwrap());
        h.source.set("Delhi", temp, "Clear");
        let report = h.poller.tick().await;
        match report.outcome("Delhi") {
            Some(CityOutcome::Updated { alert, .. }) => seen.push(alert.alert_triggered),
            other => panic!("Delhi was not updated: {other:?}"),
        }
    }

    assert_eq!(seen, vec![true, false, true, true]);
}

/// Reading the alert status never advances it
#[tokio::test]
async fn test_alert_status_reads_are_idempotent() {
    let h = harness(2);
    h.source.set("Delhi", 37.0, "Clear");
    h.poller.tick().await;

    for _ in 0..5 {
        let status = h.service.get_alert_status("Delhi").unwrap();
        assert_eq!(status.consecutive_breaches, 1);
        assert!(!status.alert_triggered);
    }
}
