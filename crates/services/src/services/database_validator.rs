//! Schema health check backing `GET /api/health`.

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;
use ts_rs::TS;

pub const REQUIRED_TABLES: [&str; 9] = [
    "profiles",
    "units",
    "tenants",
    "contracts",
    "payments",
    "maintenance_requests",
    "notification_templates",
    "notifications",
    "documents",
];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct HealthReport {
    pub initialized: bool,
    pub migrations_applied: i64,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.initialized && self.missing_tables.is_empty()
    }

    pub fn summary(&self) -> String {
        if !self.initialized {
            "Database not initialized".to_string()
        } else if !self.missing_tables.is_empty() {
            format!("Missing tables: {}", self.missing_tables.join(", "))
        } else {
            format!("Database OK, {} migrations applied", self.migrations_applied)
        }
    }
}

#[derive(Clone)]
pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn table_exists(&self, name: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn check(&self) -> Result<HealthReport, DatabaseValidationError> {
        if !self.table_exists("_sqlx_migrations").await? {
            warn!("Migrations table is missing");
            return Ok(HealthReport {
                initialized: false,
                migrations_applied: 0,
                latest_migration: None,
                missing_tables: REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
            });
        }

        let migrations_applied =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?;
        let latest_migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1
             ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let mut missing_tables = Vec::new();
        for table in REQUIRED_TABLES {
            if !self.table_exists(table).await? {
                missing_tables.push(table.to_string());
            }
        }
        if !missing_tables.is_empty() {
            warn!(missing = ?missing_tables, "Required tables are missing");
        }

        Ok(HealthReport {
            initialized: true,
            migrations_applied,
            latest_migration,
            missing_tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    #[tokio::test]
    async fn migrated_database_is_healthy() {
        let db = DBService::new_in_memory().await.unwrap();
        let report = DatabaseValidator::new(db.pool.clone()).check().await.unwrap();
        assert!(report.is_healthy(), "{}", report.summary());
        assert!(report.migrations_applied >= 1);
        assert_eq!(report.latest_migration.as_deref(), Some("init"));
    }

    #[tokio::test]
    async fn empty_database_reports_uninitialized() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let report = DatabaseValidator::new(pool).check().await.unwrap();
        assert!(!report.is_healthy());
        assert_eq!(report.missing_tables.len(), REQUIRED_TABLES.len());
        assert_eq!(report.summary(), "Database not initialized");
    }
}
