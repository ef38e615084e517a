//! aquastat - rolling water-consumption accounting and leak detection

use aquastat::{
    cli::{Cli, Command},
    engine::AccountingEngine,
    service::now_in,
    store::SnapshotStore,
    transport::OfflineMeter,
};
use aquastat_core::{
    EngineConfig, Period, Result, TimezoneConfig, WaterTariff,
    types::UnitSystem,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The --quiet flag should override RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("aquastat=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Some(Command::Inspect {
            snapshot,
            timezone,
            tariff,
            units,
            leak_threshold,
            json,
        }) => {
            inspect(snapshot, timezone.as_deref(), tariff, units, leak_threshold, json).await
        }
        Some(Command::Path) | None => {
            println!("{}", SnapshotStore::default_path().display());
            Ok(())
        }
    }
}

/// Load a snapshot offline and print the derived accounting report
async fn inspect(
    snapshot_path: Option<PathBuf>,
    timezone: Option<&str>,
    tariff: f64,
    units: UnitSystem,
    leak_threshold: f64,
    json: bool,
) -> Result<()> {
    let config = EngineConfig {
        timezone: TimezoneConfig::from_name(timezone)?,
        tariff: WaterTariff::new(tariff, units),
        leak_threshold,
    };
    info!("Using timezone: {}", config.timezone.display_name());

    let store = SnapshotStore::new(snapshot_path.unwrap_or_else(SnapshotStore::default_path));
    let snapshot = store.load().await?;
    if snapshot.is_none() {
        info!(
            "No snapshot at {}; reporting defaults",
            store.path().display()
        );
    }

    let tz = config.timezone.tz;
    let now = now_in(tz);
    // No device session: period totals reduce to their persisted baselines.
    let engine = AccountingEngine::from_snapshot(Arc::new(OfflineMeter), config, snapshot, now);

    if json {
        let report = serde_json::json!({
            "snapshot": store.path().display().to_string(),
            "timezone": tz.name(),
            "water_leak_detected": engine.water_leak_detected(),
            "volumes_l": Period::ALL
                .iter()
                .map(|p| (p.as_str().to_string(), serde_json::json!(engine.volume(*p))))
                .collect::<serde_json::Map<String, serde_json::Value>>(),
            "costs": Period::ALL
                .iter()
                .filter(|p| !matches!(p, Period::Hourly))
                .map(|p| (p.as_str().to_string(), serde_json::json!(engine.cost(*p))))
                .collect::<serde_json::Map<String, serde_json::Value>>(),
            "statistics": engine.statistics(now),
            "buffers": engine.buffer_counts(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Snapshot:  {}", store.path().display());
    println!("Timezone:  {}", tz.name());
    println!(
        "Leak:      {}",
        if engine.water_leak_detected() {
            "DETECTED"
        } else {
            "clear"
        }
    );
    println!();
    println!("Period consumption:");
    for period in Period::ALL {
        let line = format!("  {:<9} {:>12.3} L", period.as_str(), engine.volume(period));
        if period == Period::Hourly {
            println!("{line}");
        } else {
            println!("{line}   cost {:.2}", engine.cost(period));
        }
    }
    println!();
    let stats = engine.statistics(now);
    println!("Statistics:");
    println!("  avg flow (1h):       {}", fmt_opt(stats.avg_flow_1h, "L/min"));
    println!("  peak flow (24h):     {}", fmt_opt(stats.peak_flow_24h, "L/min"));
    println!("  peak flow (7d):      {}", fmt_opt(stats.peak_flow_7d, "L/min"));
    println!("  min flow (24h):      {}", fmt_opt(stats.min_flow_24h, "L/min"));
    println!("  avg hourly (24h):    {}", fmt_opt(stats.avg_hourly_24h, "L"));
    println!("  peak hourly (24h):   {}", fmt_opt(stats.peak_hourly_24h, "L"));
    println!("  peak hourly (7d):    {}", fmt_opt(stats.peak_hourly_7d, "L"));
    println!("  avg daily (7d):      {}", fmt_opt(stats.avg_daily_7d, "L"));
    println!("  avg daily (30d):     {}", fmt_opt(stats.avg_daily_30d, "L"));
    println!("  peak daily (30d):    {}", fmt_opt(stats.peak_daily_30d, "L"));
    println!();
    let buffers = engine.buffer_counts();
    println!(
        "Buffers: {} flow samples, {} hourly, {} daily, {} flow stats",
        buffers.flow_samples,
        buffers.hourly_consumption,
        buffers.daily_consumption,
        buffers.hourly_flow_stats
    );
    Ok(())
}

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.3} {unit}"),
        None => "n/a".to_string(),
    }
}
