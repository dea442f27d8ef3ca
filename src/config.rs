use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SETUP_CONFIG_PATH: &str = "/etc/coldchain/config.json";

/// Which sensor sources feed the processor. Chosen once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationMode {
    Random,
    Scenario,
}

impl SimulationMode {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("scenario") {
            SimulationMode::Scenario
        } else {
            SimulationMode::Random
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdSource {
    Fixed,
    AlertConfig,
}

impl ThresholdSource {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "fixed" => Ok(ThresholdSource::Fixed),
            "alert_config" | "alert-config" => Ok(ThresholdSource::AlertConfig),
            other => anyhow::bail!("invalid THRESHOLD_SOURCE {other:?} (expected fixed or alert_config)"),
        }
    }
}

fn setup_config_path() -> PathBuf {
    env_optional("COLDCHAIN_SETUP_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETUP_CONFIG_PATH))
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SetupConfigOverrides {
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default)]
    simulation_mode: Option<String>,
    #[serde(default)]
    threshold_source: Option<String>,
    #[serde(default)]
    max_queue: Option<usize>,
    #[serde(default)]
    alert_cooldown_secs: Option<u64>,
    #[serde(default)]
    db_pool_size: Option<u32>,
}

fn load_setup_config_overrides() -> Option<SetupConfigOverrides> {
    let path = setup_config_path();
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "coldchain-sidecar failed to read setup config; using env defaults"
            );
            return None;
        }
    };
    parse_setup_config(contents).or_else(|| {
        tracing::warn!(
            path = %path.display(),
            "coldchain-sidecar failed to parse setup config; using env defaults"
        );
        None
    })
}

fn parse_setup_config(contents: String) -> Option<SetupConfigOverrides> {
    let mut bytes = contents.into_bytes();
    simd_json::serde::from_slice(&mut bytes).ok()
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_pool_size: u32,
    pub simulation_mode: SimulationMode,
    pub threshold_source: ThresholdSource,
    pub max_queue: usize,
    pub random_interval_ms: u64,
    pub scenario_interval_ms: u64,
    pub alert_cooldown_secs: u64,
    pub stats_interval_ms: u64,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let overrides = load_setup_config_overrides().unwrap_or_default();

        let database_url = env_optional("COLDCHAIN_DATABASE_URL")
            .or_else(|| env_optional("DATABASE_URL"))
            .or_else(compose_database_url_from_parts)
            .or_else(|| {
                overrides
                    .database_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            })
            .context("COLDCHAIN_DATABASE_URL, DATABASE_URL or DB_HOST/DB_NAME is required (or database_url in the setup config)")?;

        let simulation_mode = env_optional("SIMULATION_MODE")
            .or(overrides.simulation_mode)
            .map(|value| SimulationMode::parse(&value))
            .unwrap_or(SimulationMode::Random);
        let threshold_source = match env_optional("THRESHOLD_SOURCE").or(overrides.threshold_source) {
            Some(value) => ThresholdSource::parse(&value)?,
            None => ThresholdSource::Fixed,
        };

        let max_queue = env_parse::<usize>("COLDCHAIN_MAX_QUEUE")?
            .or(overrides.max_queue)
            .filter(|v| *v != 0)
            .unwrap_or(100);
        let db_pool_size = env_parse::<u32>("COLDCHAIN_DB_POOL_SIZE")?
            .or(overrides.db_pool_size)
            .filter(|v| *v != 0)
            .unwrap_or(5);
        let alert_cooldown_secs = env_parse::<u64>("COLDCHAIN_ALERT_COOLDOWN_SECS")?
            .or(overrides.alert_cooldown_secs)
            .unwrap_or(120);
        let random_interval_ms = env_parse::<u64>("COLDCHAIN_RANDOM_INTERVAL_MS")?.unwrap_or(5_000);
        let scenario_interval_ms =
            env_parse::<u64>("COLDCHAIN_SCENARIO_INTERVAL_MS")?.unwrap_or(3_000);
        let stats_interval_ms = env_parse::<u64>("COLDCHAIN_STATS_INTERVAL_MS")?.unwrap_or(30_000);
        let otlp_endpoint = env_optional("OTEL_EXPORTER_OTLP_ENDPOINT");

        Ok(Self {
            database_url,
            db_pool_size,
            simulation_mode,
            threshold_source,
            max_queue,
            random_interval_ms,
            scenario_interval_ms,
            alert_cooldown_secs,
            stats_interval_ms,
            otlp_endpoint,
        })
    }

    pub fn random_interval(&self) -> Duration {
        Duration::from_millis(self.random_interval_ms)
    }

    pub fn scenario_interval(&self) -> Duration {
        Duration::from_millis(self.scenario_interval_ms)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_secs)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms.max(1))
    }
}

fn compose_database_url_from_parts() -> Option<String> {
    let host = env_optional("DB_HOST")?;
    let name = env_optional("DB_NAME")?;
    Some(database_url_from_parts(
        &host,
        env_optional("DB_PORT").as_deref(),
        env_optional("DB_USER").as_deref(),
        env_optional("DB_PASSWORD").as_deref(),
        &name,
    ))
}

fn database_url_from_parts(
    host: &str,
    port: Option<&str>,
    user: Option<&str>,
    password: Option<&str>,
    name: &str,
) -> String {
    let credentials = match (user, password) {
        (Some(user), Some(password)) => format!("{user}:{password}@"),
        (Some(user), None) => format!("{user}@"),
        _ => String::new(),
    };
    let port = port.unwrap_or("5432");
    format!("postgresql://{credentials}{host}:{port}/{name}")
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid {key}")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_mode_defaults_to_random() {
        assert_eq!(SimulationMode::parse("SCENARIO"), SimulationMode::Scenario);
        assert_eq!(SimulationMode::parse(" scenario "), SimulationMode::Scenario);
        assert_eq!(SimulationMode::parse("RANDOM"), SimulationMode::Random);
        assert_eq!(SimulationMode::parse("anything"), SimulationMode::Random);
    }

    #[test]
    fn threshold_source_rejects_unknown_values() {
        assert_eq!(ThresholdSource::parse("fixed").unwrap(), ThresholdSource::Fixed);
        assert_eq!(
            ThresholdSource::parse("ALERT_CONFIG").unwrap(),
            ThresholdSource::AlertConfig
        );
        assert!(ThresholdSource::parse("dynamic").is_err());
    }

    #[test]
    fn composes_database_url() {
        assert_eq!(
            database_url_from_parts("db", Some("5433"), Some("rukito"), Some("pw"), "coldchain"),
            "postgresql://rukito:pw@db:5433/coldchain"
        );
        assert_eq!(
            database_url_from_parts("localhost", None, None, None, "coldchain"),
            "postgresql://localhost:5432/coldchain"
        );
    }

    #[test]
    fn parses_setup_config_overrides() {
        let parsed = parse_setup_config(
            r#"{"database_url":"postgresql://x/y","simulation_mode":"SCENARIO","max_queue":50}"#
                .to_string(),
        )
        .expect("parsed");
        assert_eq!(parsed.database_url.as_deref(), Some("postgresql://x/y"));
        assert_eq!(parsed.simulation_mode.as_deref(), Some("SCENARIO"));
        assert_eq!(parsed.max_queue, Some(50));
        assert!(parse_setup_config("not json".to_string()).is_none());
    }
}
