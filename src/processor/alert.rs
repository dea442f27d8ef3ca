use crate::reading::{Alert, Reading};
use uuid::Uuid;

const ALERT_PRIORITY: i32 = 0;
const ALERT_TYPE: i32 = 0;
const ALERT_ID_PREFIX: &str = "ALT-";

/// Sensors guarding high-value stock, with the loss estimate attached to
/// their alerts. Every other sensor's alert carries no cost.
const HIGH_VALUE_SENSORS: &[(&str, f64)] = &[("CF-1", 15_000.0)];

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertFactory;

impl AlertFactory {
    pub fn build(&self, reading: &Reading) -> Alert {
        let uuid = Uuid::new_v4().simple().to_string();
        Alert {
            id: format!("{ALERT_ID_PREFIX}{}", &uuid[..8]),
            title: format!("CRITICAL ALERT: {}", reading.sensor_id),
            description: format!("Critical temperature: {:.1}°C", reading.temperature),
            priority: ALERT_PRIORITY,
            kind: ALERT_TYPE,
            sensor_id: reading.sensor_id.clone(),
            timestamp: reading.timestamp,
            is_read: false,
            estimated_cost: estimated_cost(&reading.sensor_id),
        }
    }
}

fn estimated_cost(sensor_id: &str) -> Option<f64> {
    HIGH_VALUE_SENSORS
        .iter()
        .find(|(id, _)| *id == sensor_id)
        .map(|(_, cost)| *cost)
}
