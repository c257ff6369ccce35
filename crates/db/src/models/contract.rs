use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "contract_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContractStatus {
    #[default]
    Active,
    Inactive,
}

/// Lease binding a tenant to a unit for a date range
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Contract {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CONTRACT_COLUMNS: &str =
    "id, tenant_id, unit_id, start_date, end_date, status, created_at, updated_at";

impl Contract {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        unit_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Contract>(&format!(
            r#"INSERT INTO contracts (id, tenant_id, unit_id, start_date, end_date, status)
               VALUES ($1, $2, $3, $4, $5, 'active')
               RETURNING {CONTRACT_COLUMNS}"#
        ))
        .bind(id)
        .bind(tenant_id)
        .bind(unit_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_active_by_tenant<'e, E>(
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE tenant_id = $1 AND status = 'active'"
        ))
        .bind(tenant_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_active_by_unit<'e, E>(
        executor: E,
        unit_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE unit_id = $1 AND status = 'active'"
        ))
        .bind(unit_id)
        .fetch_optional(executor)
        .await
    }

    /// Most recently created contract of a tenant regardless of status
    pub async fn find_latest_by_tenant<'e, E>(
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE tenant_id = $1
             ORDER BY created_at DESC, start_date DESC LIMIT 1"
        ))
        .bind(tenant_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn list_by_tenant(pool: &SqlitePool, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE tenant_id = $1 ORDER BY start_date DESC"
        ))
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    pub async fn set_status<'e, E>(
        executor: E,
        id: Uuid,
        status: ContractStatus,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE contracts SET status = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_unit<'e, E>(executor: E, id: Uuid, unit_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE contracts SET unit_id = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(unit_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_dates<'e, E>(
        executor: E,
        id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE contracts SET start_date = $2, end_date = $3, updated_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .bind(start_date)
        .bind(end_date)
        .execute(executor)
        .await?;
        Ok(())
    }
}
