mod alert;
mod state;


use crate::clock::Clock;
use crate::pipeline::IngestStats;
use crate::reading::{Alert, ChamberSnapshot, Reading, ReadingRow, Status};
use crate::store::ReadingStore;
use crate::thresholds::ThresholdTable;
use chrono::Duration as ChronoDuration;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use alert::AlertFactory;

/// What the processor derived for one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedReading {
    pub rate_of_change: f64,
    pub status: Status,
    pub alert: Option<Alert>,
    /// False when the reading row could not be written and the item was dropped.
    pub persisted: bool,
}

/// The single consumer of the ingestion queue.
///
/// Per-sensor rate-of-change and alert cooldown state live inside the
/// processor and are only touched from [`StreamProcessor::run`], so they
/// need no locking. Running more than one processor over the same sensors
/// would break the rate and dedup guarantees.
pub struct StreamProcessor {
    store: Arc<dyn ReadingStore>,
    thresholds: ThresholdTable,
    alerts: AlertFactory,
    clock: Arc<dyn Clock>,
    cooldown: ChronoDuration,
    stats: Arc<IngestStats>,
    state: state::ProcessorState,
}

impl StreamProcessor {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        thresholds: ThresholdTable,
        clock: Arc<dyn Clock>,
        cooldown: std::time::Duration,
        stats: Arc<IngestStats>,
    ) -> Self {
        let cooldown =
            ChronoDuration::from_std(cooldown).unwrap_or_else(|_| ChronoDuration::minutes(2));
        Self {
            store,
            thresholds,
            alerts: AlertFactory,
            clock,
            cooldown,
            stats,
            state: state::ProcessorState::new(),
        }
    }

    pub fn spawn(self, rx: mpsc::Receiver<Reading>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    /// Drains the queue in arrival order. Only returns once every producer
    /// handle has been dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Reading>) {
        tracing::info!(sensors = self.thresholds.len(), "stream processor started");
        while let Some(reading) = rx.recv().await {
            self.stats.mark_dequeued();
            self.process(reading).await;
        }
        tracing::warn!("ingestion queue closed; stream processor exiting");
    }

    pub async fn process(&mut self, reading: Reading) -> ProcessedReading {
        let rate_of_change = self.state.observe(&reading);
        let status = self.thresholds.classify(&reading.sensor_id, reading.temperature);
        tracing::debug!(
            sensor = %reading.sensor_id,
            temperature = reading.temperature,
            rate_of_change,
            status = %status,
            "processing reading"
        );

        let alert = if status == Status::Critical {
            self.maybe_alert(&reading).await
        } else {
            None
        };

        let row = ReadingRow {
            sensor_id: reading.sensor_id.clone(),
            temperature: reading.temperature,
            rate_of_change,
            status,
            timestamp: reading.timestamp,
        };
        if let Err(err) = self.store.insert_reading(&row).await {
            self.drop_item(&reading, "reading", &err);
            return ProcessedReading {
                rate_of_change,
                status,
                alert,
                persisted: false,
            };
        }

        let snapshot = ChamberSnapshot {
            chamber_id: reading.sensor_id.clone(),
            updated_at: reading.timestamp,
            current_temperature: reading.temperature,
            status: status.chamber_code(),
            rate_of_change,
        };
        if let Err(err) = self.store.upsert_chamber_snapshot(&snapshot).await {
            self.drop_item(&reading, "chamber snapshot", &err);
        } else {
            self.stats.readings_processed.fetch_add(1, Ordering::Relaxed);
            self.stats.clear_error();
        }

        ProcessedReading {
            rate_of_change,
            status,
            alert,
            persisted: true,
        }
    }

    async fn maybe_alert(&mut self, reading: &Reading) -> Option<Alert> {
        let now = self.clock.now();
        if !self.state.alert_due(&reading.sensor_id, now, self.cooldown) {
            tracing::trace!(sensor = %reading.sensor_id, "critical reading within alert cooldown");
            return None;
        }

        let alert = self.alerts.build(reading);
        match self.store.insert_alert(&alert).await {
            Ok(()) => {
                self.stats.alerts_created.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    sensor = %reading.sensor_id,
                    temperature = reading.temperature,
                    alert_id = %alert.id,
                    "critical alert created"
                );
            }
            Err(err) => {
                self.stats.record_error(err.to_string());
                tracing::error!(sensor = %reading.sensor_id, error = %err, "failed to persist alert");
            }
        }
        self.state.stamp_alert(&reading.sensor_id, now);
        Some(alert)
    }

    fn drop_item(&self, reading: &Reading, what: &str, err: &crate::store::StoreError) {
        self.stats.readings_dropped.fetch_add(1, Ordering::Relaxed);
        self.stats.record_error(err.to_string());
        tracing::error!(
            sensor = %reading.sensor_id,
            error = %err,
            "failed to persist {what}; dropping reading"
        );
    }
}
