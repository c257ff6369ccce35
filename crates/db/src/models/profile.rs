use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Role attached to an authenticated account
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    #[default]
    Tenant,
    ApartmentManager,
    SuperAdmin,
}

impl UserRole {
    /// Branch staff and super admins may manage tenants, units and payments.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::ApartmentManager | UserRole::SuperAdmin)
    }
}

/// Account profile keyed by the identity provider's user id
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_number: Option<String>,
    pub role: UserRole,
    pub branch: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_number: Option<String>,
    pub role: UserRole,
    pub branch: Option<String>,
}

const PROFILE_COLUMNS: &str = "id, email, first_name, last_name, contact_number, role, branch, created_at, updated_at";

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub async fn create<'e, E>(executor: E, data: &CreateProfile) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Profile>(&format!(
            r#"INSERT INTO profiles (id, email, first_name, last_name, contact_number, role, branch)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {PROFILE_COLUMNS}"#
        ))
        .bind(data.id)
        .bind(&data.email)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.contact_number)
        .bind(data.role)
        .bind(&data.branch)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_by_role(pool: &SqlitePool, role: UserRole) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE role = $1 ORDER BY branch, last_name, first_name"
        ))
        .bind(role)
        .fetch_all(pool)
        .await
    }
}
