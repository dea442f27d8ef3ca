use crate::reading::Reading;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(in crate::processor) struct SensorState {
    pub(in crate::processor) last_temperature: f64,
    pub(in crate::processor) last_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(in crate::processor) struct AlertDedupState {
    pub(in crate::processor) last_alert_at: DateTime<Utc>,
}

/// Per-sensor memory of the stream processor. Owned by the consumer task
/// alone; entries are created lazily and never removed.
#[derive(Debug, Default)]
pub(in crate::processor) struct ProcessorState {
    pub(in crate::processor) sensors: HashMap<String, SensorState>,
    pub(in crate::processor) alerts: HashMap<String, AlertDedupState>,
}

impl ProcessorState {
    pub(in crate::processor) fn new() -> Self {
        Self::default()
    }

    /// Computes degrees per minute against the previous reading of the same
    /// sensor, then records `reading` as the new previous one.
    pub(in crate::processor) fn observe(&mut self, reading: &Reading) -> f64 {
        let rate_of_change = match self.sensors.get(&reading.sensor_id) {
            Some(last) => {
                let minutes = elapsed_minutes(last.last_timestamp, reading.timestamp);
                if minutes > 0.0 {
                    (reading.temperature - last.last_temperature) / minutes
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.sensors.insert(
            reading.sensor_id.clone(),
            SensorState {
                last_temperature: reading.temperature,
                last_timestamp: reading.timestamp,
            },
        );
        rate_of_change
    }

    pub(in crate::processor) fn alert_due(
        &self,
        sensor_id: &str,
        now: DateTime<Utc>,
        cooldown: ChronoDuration,
    ) -> bool {
        match self.alerts.get(sensor_id) {
            Some(last) => now - last.last_alert_at > cooldown,
            None => true,
        }
    }

    pub(in crate::processor) fn stamp_alert(&mut self, sensor_id: &str, now: DateTime<Utc>) {
        self.alerts
            .insert(sensor_id.to_string(), AlertDedupState { last_alert_at: now });
    }
}

fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 60_000_000_000.0,
        None => delta.num_milliseconds() as f64 / 60_000.0,
    }
}
