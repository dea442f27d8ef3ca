mod pg;

#[cfg(test)]
pub(crate) mod memory;

use crate::reading::{Alert, AlertConfig, ChamberSnapshot, ReadingRow};
use async_trait::async_trait;

pub use pg::{build_pool, PgStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable sink for everything the pipeline writes. Calls are awaited
/// inline by the processor, so a slow store back-pressures the queue.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn insert_reading(&self, row: &ReadingRow) -> Result<(), StoreError>;

    async fn upsert_chamber_snapshot(&self, snapshot: &ChamberSnapshot) -> Result<(), StoreError>;

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    async fn load_alert_configs(&self) -> Result<Vec<AlertConfig>, StoreError>;
}
