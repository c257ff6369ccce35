use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "maintenance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "maintenance_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MaintenancePriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MaintenanceRequest {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub description: String,
    pub priority: MaintenancePriority,
    pub status: MaintenanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MaintenanceRequestWithTenant {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub request: MaintenanceRequest,
    pub tenant_first_name: String,
    pub tenant_last_name: String,
    pub unit_number: String,
    pub branch: String,
}

impl MaintenanceRequestWithTenant {
    pub fn tenant_name(&self) -> String {
        format!("{} {}", self.tenant_first_name, self.tenant_last_name)
    }
}

const REQUEST_COLUMNS: &str = "m.id, m.tenant_id, m.unit_id, m.description, m.priority, m.status, \
     m.created_at, m.updated_at, m.completed_at";

const WITH_TENANT: &str = "t.first_name AS tenant_first_name, t.last_name AS tenant_last_name, \
     u.unit_number, u.branch \
     FROM maintenance_requests m \
     JOIN tenants t ON t.id = m.tenant_id \
     JOIN units u ON u.id = m.unit_id";

impl MaintenanceRequest {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        tenant_id: Uuid,
        unit_id: Uuid,
        description: &str,
        priority: MaintenancePriority,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(
            r#"INSERT INTO maintenance_requests (id, tenant_id, unit_id, description, priority)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, tenant_id, unit_id, description, priority, status,
                         created_at, updated_at, completed_at"#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(unit_id)
        .bind(description)
        .bind(priority)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM maintenance_requests m WHERE m.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_with_tenant(
        pool: &SqlitePool,
        branch: Option<&str>,
        status: Option<MaintenanceStatus>,
    ) -> Result<Vec<MaintenanceRequestWithTenant>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequestWithTenant>(&format!(
            "SELECT {REQUEST_COLUMNS}, {WITH_TENANT}
             WHERE ($1 IS NULL OR u.branch = $1) AND ($2 IS NULL OR m.status = $2)
             ORDER BY m.created_at DESC"
        ))
        .bind(branch)
        .bind(status)
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_tenant(pool: &SqlitePool, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM maintenance_requests m WHERE m.tenant_id = $1
             ORDER BY m.created_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    pub async fn recent_with_tenant(
        pool: &SqlitePool,
        branch: &str,
        limit: i64,
    ) -> Result<Vec<MaintenanceRequestWithTenant>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequestWithTenant>(&format!(
            "SELECT {REQUEST_COLUMNS}, {WITH_TENANT}
             WHERE u.branch = $1
             ORDER BY m.created_at DESC
             LIMIT $2"
        ))
        .bind(branch)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Set the status; `completed_at` is stamped on completion and cleared otherwise
    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: MaintenanceStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(
            r#"UPDATE maintenance_requests
               SET status = $2,
                   completed_at = CASE WHEN $2 = 'completed' THEN datetime('now', 'subsec') ELSE NULL END,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, tenant_id, unit_id, description, priority, status,
                         created_at, updated_at, completed_at"#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_priority(
        pool: &SqlitePool,
        id: Uuid,
        priority: MaintenancePriority,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(
            r#"UPDATE maintenance_requests
               SET priority = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, tenant_id, unit_id, description, priority, status,
                         created_at, updated_at, completed_at"#,
        )
        .bind(id)
        .bind(priority)
        .fetch_optional(pool)
        .await
    }

    pub async fn count_open(pool: &SqlitePool, branch: Option<&str>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM maintenance_requests m JOIN units u ON u.id = m.unit_id
             WHERE m.status != 'completed' AND ($1 IS NULL OR u.branch = $1)",
        )
        .bind(branch)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM maintenance_requests WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
