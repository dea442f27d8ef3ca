use crate::reading::Reading;
use anyhow::Result;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use tokio::sync::mpsc;

/// Producer side of the ingestion queue. Cloned once per sensor source;
/// the single receiver belongs to the stream processor.
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<Reading>,
    stats: Arc<IngestStats>,
}

pub fn channel(capacity: usize, stats: Arc<IngestStats>) -> (QueueHandle, mpsc::Receiver<Reading>) {
    let (tx, rx) = mpsc::channel::<Reading>(capacity.max(1));
    (QueueHandle { tx, stats }, rx)
}

impl QueueHandle {
    /// Waits for a free slot when the queue is full; readings are never dropped here.
    pub async fn enqueue(&self, reading: Reading) -> Result<()> {
        let queue_depth = self.stats.queue_depth.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(queue_depth, sensor = %reading.sensor_id, "queued reading");
        if let Err(err) = self.tx.send(reading).await {
            self.stats.queue_depth.fetch_sub(1, Ordering::Relaxed);
            return Err(err.into());
        }
        self.stats.readings_enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Debug)]
pub struct IngestStats {
    pub queue_depth: AtomicU64,
    pub readings_enqueued: AtomicU64,
    pub readings_processed: AtomicU64,
    pub readings_dropped: AtomicU64,
    pub alerts_created: AtomicU64,
    pub last_error: Mutex<Option<String>>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self {
            queue_depth: AtomicU64::new(0),
            readings_enqueued: AtomicU64::new(0),
            readings_processed: AtomicU64::new(0),
            readings_dropped: AtomicU64::new(0),
            alerts_created: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub fn mark_dequeued(&self) {
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, err: impl Into<String>) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some(err.into());
        }
    }

    pub fn clear_error(&self) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = None;
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn log_summary(&self) {
        tracing::info!(
            queue_depth = self.queue_depth.load(Ordering::Relaxed),
            enqueued = self.readings_enqueued.load(Ordering::Relaxed),
            processed = self.readings_processed.load(Ordering::Relaxed),
            dropped = self.readings_dropped.load(Ordering::Relaxed),
            alerts = self.alerts_created.load(Ordering::Relaxed),
            last_error = self.last_error().as_deref().unwrap_or(""),
            "ingest stats"
        );
    }
}

impl Default for IngestStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn enqueue_blocks_when_full_instead_of_dropping() {
        let stats = Arc::new(IngestStats::new());
        let (queue, mut rx) = channel(2, stats.clone());

        queue.enqueue(Reading::new("CF-1", -20.0, Utc::now())).await.unwrap();
        queue.enqueue(Reading::new("CF-1", -20.1, Utc::now())).await.unwrap();

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            queue.enqueue(Reading::new("CF-1", -20.2, Utc::now())),
        )
        .await;
        assert!(blocked.is_err(), "third enqueue should wait for capacity");

        let first = rx.recv().await.unwrap();
        stats.mark_dequeued();
        assert_eq!(first.temperature, -20.0);

        queue.enqueue(Reading::new("CF-1", -20.3, Utc::now())).await.unwrap();
        let rest: Vec<f64> = [rx.recv().await.unwrap(), rx.recv().await.unwrap()]
            .iter()
            .map(|r| r.temperature)
            .collect();
        assert_eq!(rest, vec![-20.1, -20.3]);
    }
}
