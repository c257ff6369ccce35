use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "tenant_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TenantStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Tenant {
    pub id: Uuid,
    pub profile_id: Option<Uuid>, // Account used to sign in, once invited
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub contact_number: String,
    pub branch: String,
    pub occupation: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_number: Option<String>,
    pub valid_id_document_id: Option<Uuid>,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Tenant joined with its active contract and unit, if any
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TenantWithUnit {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub tenant: Tenant,
    pub contract_id: Option<Uuid>,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
    pub unit_id: Option<Uuid>,
    pub unit_number: Option<String>,
    pub monthly_rent_cents: Option<i64>,
}

impl std::ops::Deref for TenantWithUnit {
    type Target = Tenant;
    fn deref(&self) -> &Self::Target {
        &self.tenant
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTenant {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub contact_number: String,
    pub branch: String,
    pub occupation: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_number: Option<String>,
    pub profile_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTenant {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub occupation: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_number: Option<String>,
}

const TENANT_COLUMNS: &str = "t.id, t.profile_id, t.first_name, t.last_name, t.email, t.contact_number, \
     t.branch, t.occupation, t.emergency_contact_name, t.emergency_contact_number, \
     t.valid_id_document_id, t.status, t.created_at, t.updated_at";

const WITH_UNIT_COLUMNS: &str = "c.id AS contract_id, c.start_date AS contract_start_date, \
     c.end_date AS contract_end_date, u.id AS unit_id, u.unit_number, u.monthly_rent_cents";

const WITH_UNIT_JOIN: &str = "FROM tenants t \
     LEFT JOIN contracts c ON c.tenant_id = t.id AND c.status = 'active' \
     LEFT JOIN units u ON u.id = c.unit_id";

impl Tenant {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        data: &CreateTenant,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Tenant>(
            r#"INSERT INTO tenants (id, profile_id, first_name, last_name, email, contact_number,
                                    branch, occupation, emergency_contact_name, emergency_contact_number)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING id, profile_id, first_name, last_name, email, contact_number, branch,
                         occupation, emergency_contact_name, emergency_contact_number,
                         valid_id_document_id, status, created_at, updated_at"#,
        )
        .bind(id)
        .bind(data.profile_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.contact_number)
        .bind(&data.branch)
        .bind(&data.occupation)
        .bind(&data.emergency_contact_name)
        .bind(&data.emergency_contact_number)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Tenant>(&format!("SELECT {TENANT_COLUMNS} FROM tenants t WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants t WHERE lower(t.email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_profile_id(
        pool: &SqlitePool,
        profile_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants t WHERE t.profile_id = $1"
        ))
        .bind(profile_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_with_unit(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<TenantWithUnit>, sqlx::Error> {
        sqlx::query_as::<_, TenantWithUnit>(&format!(
            "SELECT {TENANT_COLUMNS}, {WITH_UNIT_COLUMNS} {WITH_UNIT_JOIN} WHERE t.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// All tenants of a branch (every branch when `branch` is `None`), with
    /// their current unit.
    pub async fn list_with_unit(
        pool: &SqlitePool,
        branch: Option<&str>,
    ) -> Result<Vec<TenantWithUnit>, sqlx::Error> {
        sqlx::query_as::<_, TenantWithUnit>(&format!(
            "SELECT {TENANT_COLUMNS}, {WITH_UNIT_COLUMNS} {WITH_UNIT_JOIN}
             WHERE ($1 IS NULL OR t.branch = $1)
             ORDER BY t.last_name, t.first_name"
        ))
        .bind(branch)
        .fetch_all(pool)
        .await
    }

    pub async fn list_active_with_unit(
        pool: &SqlitePool,
        branch: &str,
    ) -> Result<Vec<TenantWithUnit>, sqlx::Error> {
        sqlx::query_as::<_, TenantWithUnit>(&format!(
            "SELECT {TENANT_COLUMNS}, {WITH_UNIT_COLUMNS} {WITH_UNIT_JOIN}
             WHERE t.branch = $1 AND t.status = 'active'
             ORDER BY t.last_name, t.first_name"
        ))
        .bind(branch)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateTenant,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(
            r#"UPDATE tenants
               SET first_name = COALESCE($2, first_name),
                   last_name = COALESCE($3, last_name),
                   email = COALESCE($4, email),
                   contact_number = COALESCE($5, contact_number),
                   occupation = COALESCE($6, occupation),
                   emergency_contact_name = COALESCE($7, emergency_contact_name),
                   emergency_contact_number = COALESCE($8, emergency_contact_number),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, profile_id, first_name, last_name, email, contact_number, branch,
                         occupation, emergency_contact_name, emergency_contact_number,
                         valid_id_document_id, status, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.contact_number)
        .bind(&data.occupation)
        .bind(&data.emergency_contact_name)
        .bind(&data.emergency_contact_number)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_status<'e, E>(
        executor: E,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE tenants SET status = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_profile_id(
        pool: &SqlitePool,
        id: Uuid,
        profile_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tenants SET profile_id = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(profile_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_valid_id_document(
        pool: &SqlitePool,
        id: Uuid,
        document_id: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tenants SET valid_id_document_id = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(document_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of tenants per status in a branch
    pub async fn count_by_status(
        pool: &SqlitePool,
        branch: &str,
        status: TenantStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tenants WHERE branch = $1 AND status = $2")
            .bind(branch)
            .bind(status)
            .fetch_one(pool)
            .await
    }

    pub async fn recently_added(
        pool: &SqlitePool,
        branch: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants t WHERE t.branch = $1
             ORDER BY t.created_at DESC LIMIT $2"
        ))
        .bind(branch)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
