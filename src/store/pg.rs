use super::{ReadingStore, StoreError};
use crate::reading::{Alert, AlertConfig, ChamberSnapshot, ReadingRow};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::types::Json as SqlJson;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;

pub async fn build_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(8))
        .connect(database_url)
        .await
        .context("failed to connect to database")?;
    Ok(pool)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    async fn insert_reading(&self, row: &ReadingRow) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO temperature_readings (sensor_id, temperature, rate_of_change, status, timestamp)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&row.sensor_id)
        .bind(row.temperature)
        .bind(row.rate_of_change)
        .bind(row.status.as_str())
        .bind(row.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_chamber_snapshot(&self, snapshot: &ChamberSnapshot) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE chambers
            SET updated_at = $1,
                current_temperature = $2,
                status = $3,
                rate_of_change = $4
            WHERE id = $5
            "#,
        )
        .bind(snapshot.updated_at)
        .bind(snapshot.current_temperature)
        .bind(snapshot.status)
        .bind(snapshot.rate_of_change)
        .bind(&snapshot.chamber_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            tracing::debug!(chamber = %snapshot.chamber_id, "no chamber row for sensor");
        }
        Ok(())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO alerts (id, title, description, priority, type, sensor_id, is_read, estimated_cost, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&alert.id)
        .bind(&alert.title)
        .bind(&alert.description)
        .bind(alert.priority)
        .bind(alert.kind)
        .bind(&alert.sensor_id)
        .bind(alert.is_read)
        .bind(alert.estimated_cost)
        .bind(alert.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_alert_configs(&self) -> Result<Vec<AlertConfig>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                sensor_id,
                max_temperature,
                min_temperature,
                rate_of_change_threshold,
                priority,
                is_enabled,
                notification_channels
            FROM alert_configs
            ORDER BY sensor_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut configs = Vec::with_capacity(rows.len());
        for row in rows {
            let channels = row
                .try_get::<Option<SqlJson<Vec<String>>>, _>("notification_channels")?
                .map(|json| json.0)
                .unwrap_or_default();
            configs.push(AlertConfig {
                sensor_id: row.try_get::<String, _>("sensor_id")?,
                max_temperature: row.try_get::<f64, _>("max_temperature")?,
                min_temperature: row.try_get::<f64, _>("min_temperature")?,
                rate_of_change_threshold: row.try_get::<f64, _>("rate_of_change_threshold")?,
                priority: row.try_get::<i32, _>("priority")?,
                is_enabled: row.try_get::<bool, _>("is_enabled")?,
                notification_channels: channels,
            });
        }
        Ok(configs)
    }
}
