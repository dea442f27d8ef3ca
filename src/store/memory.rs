use super::{ReadingStore, StoreError};
use crate::reading::{Alert, AlertConfig, ChamberSnapshot, ReadingRow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub(crate) struct MemoryTables {
    pub(crate) readings: Vec<ReadingRow>,
    pub(crate) chambers: HashMap<String, ChamberSnapshot>,
    pub(crate) alerts: Vec<Alert>,
    pub(crate) alert_configs: Vec<AlertConfig>,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    tables: Mutex<MemoryTables>,
    pub(crate) fail_readings: AtomicBool,
    pub(crate) fail_chambers: AtomicBool,
    pub(crate) fail_alerts: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn with_alert_configs(configs: Vec<AlertConfig>) -> Self {
        let store = Self::default();
        store.tables.lock().expect("tables").alert_configs = configs;
        store
    }

    pub(crate) fn readings(&self) -> Vec<ReadingRow> {
        self.tables.lock().expect("tables").readings.clone()
    }

    pub(crate) fn alerts(&self) -> Vec<Alert> {
        self.tables.lock().expect("tables").alerts.clone()
    }

    pub(crate) fn chamber(&self, id: &str) -> Option<ChamberSnapshot> {
        self.tables.lock().expect("tables").chambers.get(id).cloned()
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable(format!("{what} write rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn insert_reading(&self, row: &ReadingRow) -> Result<(), StoreError> {
        Self::check(&self.fail_readings, "reading")?;
        self.tables.lock().expect("tables").readings.push(row.clone());
        Ok(())
    }

    async fn upsert_chamber_snapshot(&self, snapshot: &ChamberSnapshot) -> Result<(), StoreError> {
        Self::check(&self.fail_chambers, "chamber")?;
        self.tables
            .lock()
            .expect("tables")
            .chambers
            .insert(snapshot.chamber_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        Self::check(&self.fail_alerts, "alert")?;
        self.tables.lock().expect("tables").alerts.push(alert.clone());
        Ok(())
    }

    async fn load_alert_configs(&self) -> Result<Vec<AlertConfig>, StoreError> {
        Ok(self.tables.lock().expect("tables").alert_configs.clone())
    }
}
