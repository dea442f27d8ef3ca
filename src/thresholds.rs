use crate::reading::{AlertConfig, Status};
use std::collections::BTreeMap;

/// Raw-temperature breakpoints for one sensor. Both comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorThresholds {
    pub critical_above: f64,
    pub warning_above: Option<f64>,
}

/// Per-sensor classification table. Sensors without an entry are always NORMAL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdTable {
    rules: BTreeMap<String, SensorThresholds>,
}

impl ThresholdTable {
    /// The table the processor has always shipped with. It does not consult
    /// `alert_configs`; see [`ThresholdTable::from_alert_configs`].
    pub fn fixed() -> Self {
        let mut table = Self::default();
        table.insert(
            "CF-1",
            SensorThresholds {
                critical_above: -18.0,
                warning_above: Some(-19.0),
            },
        );
        table.insert(
            "CF-2",
            SensorThresholds {
                critical_above: 8.0,
                warning_above: None,
            },
        );
        table
    }

    /// Builds a table from the persisted alert configuration: enabled rows
    /// only, CRITICAL above `max_temperature`, no WARNING band.
    pub fn from_alert_configs(configs: &[AlertConfig]) -> Self {
        let mut table = Self::default();
        for config in configs.iter().filter(|c| c.is_enabled) {
            table.insert(
                config.sensor_id.clone(),
                SensorThresholds {
                    critical_above: config.max_temperature,
                    warning_above: None,
                },
            );
        }
        table
    }

    pub fn insert(&mut self, sensor_id: impl Into<String>, thresholds: SensorThresholds) {
        self.rules.insert(sensor_id.into(), thresholds);
    }

    pub fn get(&self, sensor_id: &str) -> Option<&SensorThresholds> {
        self.rules.get(sensor_id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn classify(&self, sensor_id: &str, temperature: f64) -> Status {
        let Some(rule) = self.rules.get(sensor_id) else {
            return Status::Normal;
        };
        if temperature > rule.critical_above {
            return Status::Critical;
        }
        match rule.warning_above {
            Some(warning) if temperature > warning => Status::Warning,
            _ => Status::Normal,
        }
    }
}

/// A sensor whose persisted alert configuration disagrees with the table
/// the processor actually classifies with.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdDrift {
    pub sensor_id: String,
    pub active_critical_above: Option<f64>,
    pub configured_max_temperature: f64,
    pub configured_enabled: bool,
}

pub fn threshold_drift(active: &ThresholdTable, configs: &[AlertConfig]) -> Vec<ThresholdDrift> {
    configs
        .iter()
        .filter_map(|config| {
            let active_critical_above = active.get(&config.sensor_id).map(|r| r.critical_above);
            let matches = config.is_enabled
                && active_critical_above
                    .map(|value| (value - config.max_temperature).abs() < f64::EPSILON)
                    .unwrap_or(false);
            if matches || (!config.is_enabled && active_critical_above.is_none()) {
                return None;
            }
            Some(ThresholdDrift {
                sensor_id: config.sensor_id.clone(),
                active_critical_above,
                configured_max_temperature: config.max_temperature,
                configured_enabled: config.is_enabled,
            })
        })
        .collect()
}

pub fn log_threshold_drift(active: &ThresholdTable, configs: &[AlertConfig]) {
    let drift = threshold_drift(active, configs);
    if drift.is_empty() {
        tracing::debug!(configs = configs.len(), "alert configuration matches active thresholds");
        return;
    }
    for entry in drift {
        tracing::warn!(
            sensor = %entry.sensor_id,
            active_critical_above = ?entry.active_critical_above,
            configured_max_temperature = entry.configured_max_temperature,
            configured_enabled = entry.configured_enabled,
            "alert configuration disagrees with active threshold table; configuration is not applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sensor_id: &str, max_temperature: f64, is_enabled: bool) -> AlertConfig {
        AlertConfig {
            sensor_id: sensor_id.to_string(),
            max_temperature,
            min_temperature: -30.0,
            rate_of_change_threshold: 0.5,
            priority: 1,
            is_enabled,
            notification_channels: Vec::new(),
        }
    }

    #[test]
    fn fixed_table_classifies_freezer_bands() {
        let table = ThresholdTable::fixed();
        assert_eq!(table.classify("CF-1", -16.0), Status::Critical);
        assert_eq!(table.classify("CF-1", -17.99), Status::Critical);
        assert_eq!(table.classify("CF-1", -18.0), Status::Warning);
        assert_eq!(table.classify("CF-1", -18.5), Status::Warning);
        assert_eq!(table.classify("CF-1", -19.0), Status::Normal);
        assert_eq!(table.classify("CF-1", -21.0), Status::Normal);
    }

    #[test]
    fn fixed_table_has_no_warning_band_for_cooler() {
        let table = ThresholdTable::fixed();
        assert_eq!(table.classify("CF-2", 10.0), Status::Critical);
        assert_eq!(table.classify("CF-2", 8.0), Status::Normal);
        assert_eq!(table.classify("CF-2", 7.9), Status::Normal);
    }

    #[test]
    fn unknown_sensor_is_always_normal() {
        let table = ThresholdTable::fixed();
        assert_eq!(table.classify("REF-3", 2.0), Status::Normal);
        assert_eq!(table.classify("REF-3", 90.0), Status::Normal);
        assert_eq!(table.classify("nope", 1000.0), Status::Normal);
    }

    #[test]
    fn alert_config_table_skips_disabled_rows() {
        let table = ThresholdTable::from_alert_configs(&[
            config("CF-1", -15.0, true),
            config("CF-2", 6.0, false),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.classify("CF-1", -16.0), Status::Normal);
        assert_eq!(table.classify("CF-1", -14.0), Status::Critical);
        assert_eq!(table.classify("CF-2", 50.0), Status::Normal);
    }

    #[test]
    fn drift_reports_mismatched_and_unconfigured_sensors() {
        let table = ThresholdTable::fixed();
        let drift = threshold_drift(
            &table,
            &[
                config("CF-1", -18.0, true),
                config("CF-2", 6.0, true),
                config("REF-3", 5.0, true),
                config("OLD-9", 1.0, false),
            ],
        );
        let sensors: Vec<&str> = drift.iter().map(|d| d.sensor_id.as_str()).collect();
        assert_eq!(sensors, vec!["CF-2", "REF-3"]);
        assert_eq!(drift[0].active_critical_above, Some(8.0));
        assert_eq!(drift[1].active_critical_above, None);
    }
}
