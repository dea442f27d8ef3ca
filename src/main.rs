mod clock;
mod config;
mod pipeline;
mod processor;
mod reading;
mod sources;
mod store;
mod thresholds;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, ThresholdSource};
use crate::pipeline::IngestStats;
use crate::processor::StreamProcessor;
use crate::store::{build_pool, PgStore, ReadingStore};
use crate::thresholds::ThresholdTable;
use anyhow::Result;
use std::sync::Arc;

fn init_tracing(config: &Config) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,coldchain_sidecar=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    if let Some(endpoint) = &config.otlp_endpoint {
        let endpoint = normalize_otlp_http_endpoint(endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "coldchain-sidecar"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

/// Picks the classification table and reports where the persisted alert
/// configuration disagrees with it. Loaded once; never refreshed.
async fn resolve_thresholds(store: &dyn ReadingStore, source: ThresholdSource) -> ThresholdTable {
    let fixed = ThresholdTable::fixed();
    let configs = match store.load_alert_configs().await {
        Ok(configs) => configs,
        Err(err) => {
            tracing::warn!(error = %err, "failed to load alert configuration; using fixed thresholds");
            return fixed;
        }
    };

    match source {
        ThresholdSource::Fixed => {
            thresholds::log_threshold_drift(&fixed, &configs);
            fixed
        }
        ThresholdSource::AlertConfig => {
            let table = ThresholdTable::from_alert_configs(&configs);
            tracing::info!(sensors = table.len(), "classifying with persisted alert configuration");
            thresholds::log_threshold_drift(&fixed, &configs);
            table
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config)?;

    let pool = build_pool(&config.database_url, config.db_pool_size).await?;
    let store: Arc<dyn ReadingStore> = Arc::new(PgStore::new(pool));
    let thresholds = resolve_thresholds(store.as_ref(), config.threshold_source).await;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let stats = Arc::new(IngestStats::new());
    let (queue, rx) = pipeline::channel(config.max_queue, stats.clone());

    let processor = StreamProcessor::new(
        store,
        thresholds,
        clock.clone(),
        config.alert_cooldown(),
        stats.clone(),
    );
    let processor_handle = processor.spawn(rx);

    tracing::info!(
        mode = ?config.simulation_mode,
        max_queue = config.max_queue,
        "starting sensor simulation"
    );
    let sources = sources::sources_for(
        config.simulation_mode,
        config.random_interval(),
        config.scenario_interval(),
    );
    let source_handles = sources::spawn_sources(sources, &queue, clock);
    drop(queue);

    let stats_interval = config.stats_interval();
    let status_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(stats_interval);
        loop {
            ticker.tick().await;
            stats.log_summary();
        }
    });

    tokio::select! {
        res = processor_handle => {
            if let Err(err) = res { tracing::error!(error=%err, "stream processor task failed"); }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    status_handle.abort();
    for handle in source_handles {
        handle.abort();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{AlertConfig, Status};
    use crate::store::memory::MemoryStore;

    fn cooler_config(max_temperature: f64) -> AlertConfig {
        AlertConfig {
            sensor_id: "CF-2".to_string(),
            max_temperature,
            min_temperature: 0.0,
            rate_of_change_threshold: 1.0,
            priority: 1,
            is_enabled: true,
            notification_channels: vec!["sms".to_string()],
        }
    }

    #[test]
    fn normalizes_otlp_endpoint() {
        assert_eq!(
            normalize_otlp_http_endpoint("http://collector:4318/"),
            "http://collector:4318/v1/traces"
        );
        assert_eq!(
            normalize_otlp_http_endpoint("http://collector:4318/v1/traces"),
            "http://collector:4318/v1/traces"
        );
        assert_eq!(normalize_otlp_http_endpoint("  "), "");
    }

    #[tokio::test]
    async fn fixed_source_ignores_persisted_configuration() {
        let store = MemoryStore::with_alert_configs(vec![cooler_config(6.0)]);
        let table = resolve_thresholds(&store, ThresholdSource::Fixed).await;
        assert_eq!(table, ThresholdTable::fixed());
        assert_eq!(table.classify("CF-2", 7.0), Status::Normal);
    }

    #[tokio::test]
    async fn alert_config_source_uses_persisted_configuration() {
        let store = MemoryStore::with_alert_configs(vec![cooler_config(6.0)]);
        let table = resolve_thresholds(&store, ThresholdSource::AlertConfig).await;
        assert_eq!(table.classify("CF-2", 7.0), Status::Critical);
        assert_eq!(table.classify("CF-1", -16.0), Status::Normal);
    }
}
