//! Single-writer service loop around the engine
//!
//! One task owns all engine mutation: it consumes the transport's serialized
//! tick-notification stream, applies each tick under the write half of an
//! `RwLock`, and lets consumers read derived values under the read half, so
//! no reader ever observes a half-finalized period. A snapshot save runs on
//! a periodic interval and once more when the tick stream ends.

use crate::engine::AccountingEngine;
use crate::store::SnapshotStore;
use crate::transport::MeterTransport;
use aquastat_core::error::Result;
use aquastat_core::types::{EngineConfig, SAVE_INTERVAL_SECS};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// Runs the accounting engine against a tick stream
pub struct MeterService {
    engine: Arc<RwLock<AccountingEngine>>,
    store: SnapshotStore,
    updates: watch::Sender<()>,
    tz: Tz,
}

impl MeterService {
    /// Build the service: load the snapshot, restore the engine, roll over
    /// boundaries crossed while the process was down, then register live
    /// accumulators.
    pub async fn start(
        transport: Arc<dyn MeterTransport>,
        config: EngineConfig,
        store: SnapshotStore,
    ) -> Result<Self> {
        let tz = config.timezone.tz;
        let now = now_in(tz);

        let snapshot = store.load().await?;
        if snapshot.is_some() {
            info!("Restored snapshot from {}", store.path().display());
        }

        let mut engine = AccountingEngine::from_snapshot(transport, config, snapshot, now);
        engine.handle_stale_boundaries(now);
        engine.register_accumulators(now);

        let (updates, _) = watch::channel(());
        Ok(Self {
            engine: Arc::new(RwLock::new(engine)),
            store,
            updates,
            tz,
        })
    }

    /// Shared handle to the engine for concurrent readers
    pub fn engine(&self) -> Arc<RwLock<AccountingEngine>> {
        self.engine.clone()
    }

    /// Subscribe to "data changed" notifications
    ///
    /// Notifications carry no payload; subscribers re-read the engine's
    /// properties.
    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.updates.subscribe()
    }

    /// Consume the tick stream until it ends, then save a final snapshot
    ///
    /// Tick items carry no payload: the transport has already refreshed its
    /// getters when it notifies, matching the push model of the device.
    /// Periodic save failures are logged and retried on the next interval;
    /// only a failed shutdown save surfaces as an error.
    pub async fn run<S>(&self, ticks: S) -> Result<()>
    where
        S: Stream<Item = ()> + Unpin,
    {
        let mut ticks = ticks;
        let mut save_timer = interval(Duration::from_secs(SAVE_INTERVAL_SECS));
        save_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick fires immediately; skip it so startup does
        // not write a snapshot before any telemetry arrives.
        save_timer.tick().await;

        loop {
            tokio::select! {
                item = ticks.next() => {
                    match item {
                        Some(()) => {
                            let now = now_in(self.tz);
                            let updated = self.engine.write().await.on_tick(now);
                            if !updated {
                                debug!("Tick while device unavailable");
                            }
                            // Consumers re-read properties either way; an
                            // unavailable device is itself a state change.
                            let _ = self.updates.send(());
                        }
                        None => break,
                    }
                }
                _ = save_timer.tick() => {
                    // A failed save must not stop accounting; the next
                    // interval (or shutdown) retries with newer state.
                    if let Err(e) = self.save().await {
                        warn!("Periodic snapshot save failed: {}", e);
                    }
                }
            }
        }

        info!("Tick stream ended; saving final snapshot");
        self.save().await
    }

    /// Write a consistent point-in-time snapshot
    pub async fn save(&self) -> Result<()> {
        let data = self.engine.read().await.snapshot();
        self.store.save(&data).await
    }
}

/// Current wall-clock time in the engine's timezone
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquastat_core::period::Period;
    use aquastat_core::timezone::TimezoneConfig;
    use tokio_stream::wrappers::ReceiverStream;

    /// Steady-state meter for service-level tests
    struct SteadyMeter {
        flow_rate: f64,
    }

    impl MeterTransport for SteadyMeter {
        fn flow_rate(&self) -> f64 {
            self.flow_rate
        }

        fn volume_delta(&self) -> f64 {
            0.0
        }

        fn availability(&self) -> bool {
            true
        }

        fn accumulated_volume(&self, _period: Period) -> f64 {
            0.0
        }

        fn add_accumulator(&self, _period: Period, _target: DateTime<Tz>) {}

        fn reset_accumulator(&self, _period: Period, _next: DateTime<Tz>) {}
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            timezone: TimezoneConfig::utc(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_processes_ticks_and_saves_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        let transport = Arc::new(SteadyMeter { flow_rate: 1.25 });
        let service = MeterService::start(transport, test_config(), store.clone())
            .await
            .unwrap();

        let mut updates = service.subscribe();
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tx.send(()).await.unwrap();
        tx.send(()).await.unwrap();
        drop(tx);

        service.run(ReceiverStream::new(rx)).await.unwrap();

        assert!(updates.has_changed().unwrap());
        let engine = service.engine();
        let guard = engine.read().await;
        assert_eq!(guard.flow_rate(), 1.25);
        assert_eq!(guard.buffer_counts().flow_samples, 2);
        drop(guard);

        // Final save landed on disk
        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.flow_samples.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_periodic_save_does_not_stop_accounting() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("data").join("snapshot.json"));
        let transport = Arc::new(SteadyMeter { flow_rate: 2.0 });
        let service = MeterService::start(transport, test_config(), store)
            .await
            .unwrap();
        // A regular file where the snapshot directory should be makes every
        // save fail.
        tokio::fs::write(dir.path().join("data"), b"in the way")
            .await
            .unwrap();

        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let sender = tokio::spawn(async move {
            tx.send(()).await.unwrap();
            // Let the save interval fire (and fail) between the two ticks
            tokio::time::sleep(Duration::from_secs(SAVE_INTERVAL_SECS + 20)).await;
            tx.send(()).await.unwrap();
        });

        // The failed mid-run save is swallowed; only the shutdown save errors
        let result = service.run(ReceiverStream::new(rx)).await;
        sender.await.unwrap();
        assert!(result.is_err());

        // Accounting continued through the failure: both ticks landed
        let engine = service.engine();
        let guard = engine.read().await;
        assert_eq!(guard.buffer_counts().flow_samples, 2);
        assert_eq!(guard.flow_rate(), 2.0);
    }

    #[tokio::test]
    async fn test_start_without_snapshot_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("missing.json"));
        let transport = Arc::new(SteadyMeter { flow_rate: 0.0 });
        let service = MeterService::start(transport, test_config(), store)
            .await
            .unwrap();

        let engine = service.engine();
        let guard = engine.read().await;
        assert_eq!(guard.volume(Period::Lifetime), 0.0);
        assert!(!guard.water_leak_detected());
    }
}
