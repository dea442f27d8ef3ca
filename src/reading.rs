use chrono::{DateTime, Utc};
use std::fmt;

/// One timestamped temperature sample, as emitted by a sensor source.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub sensor_id: String,
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(sensor_id: impl Into<String>, temperature: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            temperature,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Normal,
    Warning,
    Critical,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Normal => "NORMAL",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
        }
    }

    /// Chamber status code: 0 = online, 1 = degraded.
    pub fn chamber_code(self) -> i32 {
        match self {
            Status::Normal => 0,
            Status::Warning | Status::Critical => 1,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row appended to `temperature_readings` for every processed reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRow {
    pub sensor_id: String,
    pub temperature: f64,
    pub rate_of_change: f64,
    pub status: Status,
    pub timestamp: DateTime<Utc>,
}

/// Last-known state of a chamber; the chamber id is the sensor id.
#[derive(Debug, Clone, PartialEq)]
pub struct ChamberSnapshot {
    pub chamber_id: String,
    pub updated_at: DateTime<Utc>,
    pub current_temperature: f64,
    pub status: i32,
    pub rate_of_change: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: i32,
    pub kind: i32,
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub estimated_cost: Option<f64>,
}

/// Persisted per-sensor alert configuration. Owned by the API layer; the
/// pipeline only reads it at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertConfig {
    pub sensor_id: String,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub rate_of_change_threshold: f64,
    pub priority: i32,
    pub is_enabled: bool,
    pub notification_channels: Vec<String>,
}
