use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::notification::NotificationType;

/// Reusable subject/message pair with `{{placeholder}}` fields
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct NotificationTemplate {
    pub id: Uuid,
    pub name: String,
    pub notification_type: NotificationType,
    pub subject: String,
    pub message: String,
    pub branch: Option<String>, // None applies to every branch
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateNotificationTemplate {
    pub name: String,
    pub notification_type: NotificationType,
    pub subject: String,
    pub message: String,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateNotificationTemplate {
    pub name: Option<String>,
    pub notification_type: Option<NotificationType>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

const TEMPLATE_COLUMNS: &str =
    "id, name, notification_type, subject, message, branch, created_at, updated_at";

impl NotificationTemplate {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateNotificationTemplate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, NotificationTemplate>(&format!(
            r#"INSERT INTO notification_templates (id, name, notification_type, subject, message, branch)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {TEMPLATE_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(data.notification_type)
        .bind(&data.subject)
        .bind(&data.message)
        .bind(&data.branch)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, NotificationTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM notification_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Templates of a branch plus the global ones. `None` lists everything.
    pub async fn list_for_branch(
        pool: &SqlitePool,
        branch: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, NotificationTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM notification_templates
             WHERE $1 IS NULL OR branch IS NULL OR branch = $1
             ORDER BY name"
        ))
        .bind(branch)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateNotificationTemplate,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, NotificationTemplate>(&format!(
            r#"UPDATE notification_templates
               SET name = COALESCE($2, name),
                   notification_type = COALESCE($3, notification_type),
                   subject = COALESCE($4, subject),
                   message = COALESCE($5, message),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {TEMPLATE_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(data.notification_type)
        .bind(&data.subject)
        .bind(&data.message)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notification_templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
