use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "unit_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnitStatus {
    #[default]
    Available,
    Occupied,
    Maintenance,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Unit {
    pub id: Uuid,
    pub unit_number: String,
    pub unit_type: String,
    pub monthly_rent_cents: i64,
    pub status: UnitStatus,
    pub branch: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUnit {
    pub unit_number: String,
    pub unit_type: String,
    pub monthly_rent_cents: i64,
    pub branch: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateUnit {
    pub unit_number: Option<String>,
    pub unit_type: Option<String>,
    pub monthly_rent_cents: Option<i64>,
    pub status: Option<UnitStatus>,
}

/// Unit counts per status for a branch
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UnitStatusCounts {
    pub available: i64,
    pub occupied: i64,
    pub maintenance: i64,
}

const UNIT_COLUMNS: &str =
    "id, unit_number, unit_type, monthly_rent_cents, status, branch, created_at, updated_at";

impl Unit {
    pub async fn create(pool: &SqlitePool, id: Uuid, data: &CreateUnit) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!(
            r#"INSERT INTO units (id, unit_number, unit_type, monthly_rent_cents, branch)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {UNIT_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.unit_number)
        .bind(&data.unit_type)
        .bind(data.monthly_rent_cents)
        .bind(&data.branch)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Unit>(&format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_number(
        pool: &SqlitePool,
        branch: &str,
        unit_number: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE branch = $1 AND unit_number = $2"
        ))
        .bind(branch)
        .bind(unit_number)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &SqlitePool,
        branch: Option<&str>,
        status: Option<UnitStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units
             WHERE ($1 IS NULL OR branch = $1) AND ($2 IS NULL OR status = $2)
             ORDER BY branch, unit_number"
        ))
        .bind(branch)
        .bind(status)
        .fetch_all(pool)
        .await
    }

    /// Updates descriptive fields only; status goes through `set_status`.
    pub async fn update_details(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateUnit,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!(
            r#"UPDATE units
               SET unit_number = COALESCE($2, unit_number),
                   unit_type = COALESCE($3, unit_type),
                   monthly_rent_cents = COALESCE($4, monthly_rent_cents),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {UNIT_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.unit_number)
        .bind(&data.unit_type)
        .bind(data.monthly_rent_cents)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_status<'e, E>(executor: E, id: Uuid, status: UnitStatus) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE units SET status = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn status_counts(
        pool: &SqlitePool,
        branch: Option<&str>,
    ) -> Result<UnitStatusCounts, sqlx::Error> {
        let rows: Vec<(UnitStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM units WHERE ($1 IS NULL OR branch = $1) GROUP BY status",
        )
        .bind(branch)
        .fetch_all(pool)
        .await?;

        let mut counts = UnitStatusCounts::default();
        for (status, count) in rows {
            match status {
                UnitStatus::Available => counts.available = count,
                UnitStatus::Occupied => counts.occupied = count,
                UnitStatus::Maintenance => counts.maintenance = count,
            }
        }
        Ok(counts)
    }

    /// Distinct branches that have at least one unit
    pub async fn branches(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT DISTINCT branch FROM units ORDER BY branch")
            .fetch_all(pool)
            .await
    }

    pub async fn has_contracts(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contracts WHERE unit_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM units WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
