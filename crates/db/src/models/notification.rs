use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    PaymentReminder,
    Maintenance,
    Announcement,
    #[default]
    General,
}

/// Channels a notification is delivered through
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "delivery_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryMethod {
    Email,
    Sms,
    SmsAndEmail,
}

impl DeliveryMethod {
    pub fn includes_email(&self) -> bool {
        matches!(self, DeliveryMethod::Email | DeliveryMethod::SmsAndEmail)
    }

    pub fn includes_sms(&self) -> bool {
        matches!(self, DeliveryMethod::Sms | DeliveryMethod::SmsAndEmail)
    }
}

/// One delivered notification per recipient tenant
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Notification {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub notification_type: NotificationType,
    pub subject: String,
    pub message: String,
    pub delivery_method: DeliveryMethod,
    pub sent_by: Option<Uuid>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateNotification<'a> {
    pub tenant_id: Uuid,
    pub notification_type: NotificationType,
    pub subject: &'a str,
    pub message: &'a str,
    pub delivery_method: DeliveryMethod,
    pub sent_by: Option<Uuid>,
}

const NOTIFICATION_COLUMNS: &str = "id, tenant_id, notification_type, subject, message, \
     delivery_method, sent_by, read_at, created_at";

impl Notification {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        data: &CreateNotification<'_>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Notification>(&format!(
            r#"INSERT INTO notifications (id, tenant_id, notification_type, subject, message,
                                          delivery_method, sent_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(id)
        .bind(data.tenant_id)
        .bind(data.notification_type)
        .bind(data.subject)
        .bind(data.message)
        .bind(data.delivery_method)
        .bind(data.sent_by)
        .fetch_one(executor)
        .await
    }

    pub async fn list_by_tenant(pool: &SqlitePool, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE tenant_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    /// Mark read, scoped to the owning tenant. Returns `None` if not theirs.
    pub async fn mark_read(
        pool: &SqlitePool,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"UPDATE notifications
               SET read_at = COALESCE(read_at, datetime('now', 'subsec'))
               WHERE id = $1 AND tenant_id = $2
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn count_for_tenant(pool: &SqlitePool, tenant_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(pool)
            .await
    }
}
