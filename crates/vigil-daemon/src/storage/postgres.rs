//! PostgreSQL storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use std::time::Duration;
use uuid::Uuid;
use vigil_types::{MonitoredService, PropertyMap, ServiceId, ServiceStateUpdate};

const SERVICE_COLUMNS: &str = "id, application_type, source_id, is_alive, \
     is_alive_transition_at, last_notified_transition, last_snapshot, is_active";

/// PostgreSQL-backed storage
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to PostgreSQL and initialize schema
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let storage = Self { pool };
        storage.initialize_schema().await?;
        Ok(storage)
    }

    async fn initialize_schema(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS monitored_services (
                id UUID PRIMARY KEY,
                application_type TEXT NOT NULL,
                source_id TEXT NOT NULL,
                is_alive BOOLEAN NOT NULL,
                is_alive_transition_at TIMESTAMPTZ NOT NULL,
                last_notified_transition BOOLEAN NOT NULL,
                last_snapshot JSONB,
                is_active BOOLEAN NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS monitored_services_active ON monitored_services(is_active);"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }

        Ok(())
    }

    fn snapshot_to_json(snapshot: &Option<PropertyMap>) -> Result<Option<Value>, StorageError> {
        snapshot
            .as_ref()
            .map(|map| {
                serde_json::to_value(map)
                    .map_err(|e| StorageError::InvalidData(format!("json serialize error: {}", e)))
            })
            .transpose()
    }

    fn service_from_row(row: &PgRow) -> Result<MonitoredService, StorageError> {
        let query_err = |e: sqlx::Error| StorageError::Query(e.to_string());

        let id: Uuid = row.try_get("id").map_err(query_err)?;
        let snapshot: Option<Value> = row.try_get("last_snapshot").map_err(query_err)?;
        let last_snapshot = snapshot
            .map(|value| {
                serde_json::from_value::<PropertyMap>(value).map_err(|e| {
                    StorageError::InvalidData(format!("json deserialize error: {}", e))
                })
            })
            .transpose()?;
        let transition_at: DateTime<Utc> =
            row.try_get("is_alive_transition_at").map_err(query_err)?;

        Ok(MonitoredService {
            id: ServiceId::from_uuid(id),
            application_type: row.try_get("application_type").map_err(query_err)?,
            source_id: row.try_get("source_id").map_err(query_err)?,
            is_alive: row.try_get("is_alive").map_err(query_err)?,
            is_alive_transition_at: transition_at,
            last_notified_transition: row.try_get("last_notified_transition").map_err(query_err)?,
            last_snapshot,
            is_active: row.try_get("is_active").map_err(query_err)?,
        })
    }

    async fn select_services(&self, active_only: bool) -> StorageResult<Vec<MonitoredService>> {
        let sql = if active_only {
            format!(
                "SELECT {} FROM monitored_services WHERE is_active ORDER BY application_type, id",
                SERVICE_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM monitored_services ORDER BY application_type, id",
                SERVICE_COLUMNS
            )
        };

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(Self::service_from_row).collect()
    }
}

#[async_trait]
impl ServiceStorage for PostgresStorage {
    async fn register_service(&self, service: MonitoredService) -> StorageResult<()> {
        let snapshot = Self::snapshot_to_json(&service.last_snapshot)?;

        let result = sqlx::query(
            r#"
            INSERT INTO monitored_services (
                id, application_type, source_id, is_alive, is_alive_transition_at,
                last_notified_transition, last_snapshot, is_active, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(*service.id.as_uuid())
        .bind(&service.application_type)
        .bind(&service.source_id)
        .bind(service.is_alive)
        .bind(service.is_alive_transition_at)
        .bind(service.last_notified_transition)
        .bind(snapshot)
        .bind(service.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(service.id.to_string()));
        }
        Ok(())
    }

    async fn get_service(&self, id: &ServiceId) -> StorageResult<Option<MonitoredService>> {
        let sql = format!("SELECT {} FROM monitored_services WHERE id = $1", SERVICE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::service_from_row).transpose()
    }

    async fn list_services(&self) -> StorageResult<Vec<MonitoredService>> {
        self.select_services(false).await
    }

    async fn list_active_services(&self) -> StorageResult<Vec<MonitoredService>> {
        self.select_services(true).await
    }

    async fn update_service_state(
        &self,
        id: &ServiceId,
        update: ServiceStateUpdate,
    ) -> StorageResult<()> {
        let snapshot = Self::snapshot_to_json(&update.last_snapshot)?;

        let result = sqlx::query(
            r#"
            UPDATE monitored_services
            SET is_alive = $2,
                is_alive_transition_at = $3,
                last_notified_transition = $4,
                last_snapshot = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .bind(update.is_alive)
        .bind(update.is_alive_transition_at)
        .bind(update.last_notified_transition)
        .bind(snapshot)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_active(&self, id: &ServiceId, active: bool) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE monitored_services SET is_active = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::Property;

    #[test]
    fn test_snapshot_json_roundtrip_keeps_undefined() {
        let mut snapshot = PropertyMap::new();
        snapshot.insert("depth".into(), Property::watched("Queue depth", 4i64));
        snapshot.insert(
            "region".into(),
            Property {
                name: "Region".into(),
                value: None,
                watch_for_change: false,
            },
        );

        let json = PostgresStorage::snapshot_to_json(&Some(snapshot.clone()))
            .unwrap()
            .unwrap();
        let back: PropertyMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
        assert!(back["region"].value.is_none());
    }

    #[test]
    fn test_no_snapshot_is_sql_null() {
        assert!(PostgresStorage::snapshot_to_json(&None).unwrap().is_none());
    }
}
