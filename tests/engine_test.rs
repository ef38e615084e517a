//! End-to-end tests for the accounting engine and its persistence

mod common;

use aquastat::engine::AccountingEngine;
use aquastat::store::{SnapshotData, SnapshotStore};
use aquastat_core::types::{EngineConfig, UnitSystem, WaterTariff};
use aquastat_core::{Period, TimezoneConfig};
use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use common::FakeMeter;
use std::sync::Arc;

fn utc_config() -> EngineConfig {
    EngineConfig {
        timezone: TimezoneConfig::utc(),
        tariff: WaterTariff::new(3.0, UnitSystem::Metric),
        leak_threshold: 0.05,
    }
}

fn at(d: u32, h: u32, m: u32) -> DateTime<Tz> {
    Tz::UTC.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
}

/// A tick 61 minutes after the hour reset archives (T0, 0.15 L) and
/// (T0, 2.5, 2.5), and the new hour starts from a zero baseline.
#[test]
fn test_hour_crossing_end_to_end() {
    let meter = Arc::new(FakeMeter::new());
    let t0 = at(15, 10, 0);
    let mut engine = AccountingEngine::new(meter.clone(), utc_config(), t0);
    engine.register_accumulators(t0);

    meter.set_flow_rate(2.5);
    engine.on_tick(at(15, 10, 59));

    meter.set_accumulated(Period::Hourly, 150.0);
    meter.set_flow_rate(1.0);
    engine.on_tick(at(15, 11, 1));

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.hourly_consumption.len(), 1);
    let archived = snapshot.hourly_consumption[0];
    assert_eq!(archived.ts, t0.timestamp() as f64);
    assert!((archived.value - 0.15).abs() < 1e-12);

    assert_eq!(snapshot.hourly_flow_stats.len(), 1);
    let stats = snapshot.hourly_flow_stats[0];
    assert_eq!((stats.max, stats.min), (2.5, 2.5));

    assert_eq!(engine.volume(Period::Hourly), 0.0);

    // The hourly accumulator was re-aimed at the top of the next hour
    let resets = meter.resets.lock().unwrap();
    assert_eq!(resets.len(), 1);
    assert_eq!(resets[0], (Period::Hourly, at(15, 12, 0)));
}

/// Catch-up after a restart archives the same history a live crossing would
/// have (ignoring live accumulator contribution, since none existed).
#[test]
fn test_catch_up_equivalence() {
    let reset_str = "2024-01-15T09:00:00+00:00";
    let now = at(15, 11, 30);

    // Live path: engine running since 09:00 with a 0.3 L baseline and no
    // live accumulator contribution.
    let live_meter = Arc::new(FakeMeter::new());
    let live_snapshot = SnapshotData {
        hourly_volume: 0.3,
        hourly_reset: Some(reset_str.to_string()),
        hourly_max_flow: 1.2,
        hourly_min_flow: Some(0.1),
        ..Default::default()
    };
    let mut live = AccountingEngine::from_snapshot(
        live_meter.clone(),
        utc_config(),
        Some(live_snapshot.clone()),
        at(15, 9, 0),
    );
    live.register_accumulators(at(15, 9, 0));
    live.on_tick(now);

    // Restart path: same persisted state, stale boundary handled at startup.
    let restart_meter = Arc::new(FakeMeter::new());
    let mut restarted = AccountingEngine::from_snapshot(
        restart_meter.clone(),
        utc_config(),
        Some(live_snapshot),
        now,
    );
    restarted.handle_stale_boundaries(now);
    restarted.register_accumulators(now);

    let live_data = live.snapshot();
    let restart_data = restarted.snapshot();
    assert_eq!(live_data.hourly_consumption, restart_data.hourly_consumption);
    assert_eq!(live_data.hourly_flow_stats, restart_data.hourly_flow_stats);
    assert_eq!(restart_data.hourly_volume, 0.0);
}

#[test]
fn test_register_accumulators_covers_all_periods() {
    let meter = Arc::new(FakeMeter::new());
    let now = at(15, 10, 30);
    let engine = AccountingEngine::new(meter.clone(), utc_config(), now);
    engine.register_accumulators(now);

    let registered = meter.registered.lock().unwrap();
    assert_eq!(registered.len(), 6);
    assert_eq!(registered[0], (Period::Hourly, at(15, 11, 0)));
    assert_eq!(registered[1], (Period::Daily, at(16, 0, 0)));
    // 2024-01-15 is a Monday
    assert_eq!(registered[2], (Period::Weekly, at(22, 0, 0)));
    assert_eq!(
        registered[3],
        (Period::Monthly, Tz::UTC.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(
        registered[4],
        (Period::Yearly, Tz::UTC.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    );
    // Lifetime target is a far-future sentinel
    assert!(registered[5].1 > Tz::UTC.with_ymd_and_hms(9000, 1, 1, 0, 0, 0).unwrap());
}

#[test]
fn test_simultaneous_hour_and_day_crossing_archives_both() {
    let meter = Arc::new(FakeMeter::new());
    let start = at(15, 23, 0);
    let mut engine = AccountingEngine::new(meter.clone(), utc_config(), start);
    engine.register_accumulators(start);

    meter.set_flow_rate(2.0);
    engine.on_tick(at(15, 23, 30));

    meter.set_accumulated(Period::Hourly, 100.0);
    meter.set_accumulated(Period::Daily, 400.0);
    engine.on_tick(at(16, 0, 1));

    let snapshot = engine.snapshot();
    // Hour archived 0.1 L at 23:00, day archived 0.4 L at its reset
    assert_eq!(snapshot.hourly_consumption.len(), 1);
    assert!((snapshot.hourly_consumption[0].value - 0.1).abs() < 1e-12);
    assert_eq!(snapshot.daily_consumption.len(), 1);
    assert!((snapshot.daily_consumption[0].value - 0.4).abs() < 1e-12);

    // Hour was finalized before the day: both accumulators reset once
    let resets = meter.resets.lock().unwrap();
    assert_eq!(resets[0].0, Period::Hourly);
    assert_eq!(resets[1].0, Period::Daily);
}

#[test]
fn test_unavailable_device_freezes_state_and_resumes() {
    let meter = Arc::new(FakeMeter::new());
    let start = at(15, 10, 0);
    let mut engine = AccountingEngine::new(meter.clone(), utc_config(), start);
    engine.register_accumulators(start);

    meter.set_flow_rate(1.0);
    assert!(engine.on_tick(at(15, 10, 30)));

    // Even a boundary-crossing tick is ignored while unavailable
    meter.set_available(false);
    assert!(!engine.on_tick(at(15, 11, 5)));
    assert_eq!(engine.snapshot().hourly_consumption.len(), 0);

    // Resumes cleanly: the crossing fires on the next available tick
    meter.set_available(true);
    assert!(engine.on_tick(at(15, 11, 6)));
    assert_eq!(engine.snapshot().hourly_consumption.len(), 1);
}

#[tokio::test]
async fn test_store_round_trip_matches_engine() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("snapshot.json"));

    let meter = Arc::new(FakeMeter::new());
    let start = at(15, 10, 0);
    let mut engine = AccountingEngine::new(meter.clone(), utc_config(), start);
    engine.register_accumulators(start);

    meter.set_flow_rate(2.0);
    meter.set_volume_delta(33.0);
    engine.on_tick(at(15, 10, 30));
    meter.set_flow_rate(0.25);
    engine.on_tick(at(15, 11, 2));

    store.save(&engine.snapshot()).await.unwrap();
    let loaded = store.load().await.unwrap().unwrap();

    let restored =
        AccountingEngine::from_snapshot(meter.clone(), utc_config(), Some(loaded), at(15, 11, 3));

    let now = at(15, 11, 3);
    for period in Period::ALL {
        assert_eq!(restored.volume(period), engine.volume(period));
    }
    assert_eq!(restored.statistics(now), engine.statistics(now));
    assert_eq!(restored.buffer_counts(), engine.buffer_counts());
    assert_eq!(restored.water_leak_detected(), engine.water_leak_detected());
    // The in-flight hour trackers survive the round trip
    assert_eq!(
        restored.snapshot().hourly_min_flow,
        engine.snapshot().hourly_min_flow
    );
}
