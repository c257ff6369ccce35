use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "payment_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    BankTransfer,
    Gcash,
    Check,
    Other,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub contract_id: Uuid,
    pub amount_cents: i64,
    pub payment_date: NaiveDate,
    pub payment_mode: PaymentMode,
    pub status: PaymentStatus,
    pub receipt_path: Option<String>, // Object path inside the receipts bucket
    pub notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Payment joined with the paying tenant and the contract's unit
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PaymentWithTenant {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub payment: Payment,
    pub tenant_first_name: String,
    pub tenant_last_name: String,
    pub branch: String,
    pub unit_number: Option<String>,
}

impl PaymentWithTenant {
    pub fn tenant_name(&self) -> String {
        format!("{} {}", self.tenant_first_name, self.tenant_last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreatePayment {
    pub tenant_id: Uuid,
    pub contract_id: Uuid,
    pub amount_cents: i64,
    pub payment_date: NaiveDate,
    pub payment_mode: PaymentMode,
    pub status: PaymentStatus,
    pub receipt_path: Option<String>,
    pub notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
}

const PAYMENT_COLUMNS: &str = "p.id, p.tenant_id, p.contract_id, p.amount_cents, p.payment_date, \
     p.payment_mode, p.status, p.receipt_path, p.notes, p.reviewed_by, p.reviewed_at, p.created_at";

const WITH_TENANT_JOIN: &str = "FROM payments p \
     JOIN tenants t ON t.id = p.tenant_id \
     LEFT JOIN contracts c ON c.id = p.contract_id \
     LEFT JOIN units u ON u.id = c.unit_id";

impl Payment {
    pub async fn create(pool: &SqlitePool, id: Uuid, data: &CreatePayment) -> Result<Self, sqlx::Error> {
        // Staff-recorded payments are reviewed at creation time
        sqlx::query_as::<_, Payment>(
            r#"INSERT INTO payments (id, tenant_id, contract_id, amount_cents, payment_date, payment_mode,
                                     status, receipt_path, notes, reviewed_by, reviewed_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                       CASE WHEN $10 IS NULL THEN NULL ELSE datetime('now', 'subsec') END)
               RETURNING id, tenant_id, contract_id, amount_cents, payment_date, payment_mode, status,
                         receipt_path, notes, reviewed_by, reviewed_at, created_at"#,
        )
        .bind(id)
        .bind(data.tenant_id)
        .bind(data.contract_id)
        .bind(data.amount_cents)
        .bind(data.payment_date)
        .bind(data.payment_mode)
        .bind(data.status)
        .bind(&data.receipt_path)
        .bind(&data.notes)
        .bind(data.reviewed_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments p WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_tenant(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<PaymentWithTenant>, sqlx::Error> {
        sqlx::query_as::<_, PaymentWithTenant>(&format!(
            "SELECT {PAYMENT_COLUMNS}, t.first_name AS tenant_first_name, t.last_name AS tenant_last_name,
                    t.branch, u.unit_number
             {WITH_TENANT_JOIN}
             WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Payments of a branch (every branch when `None`), newest first
    pub async fn list_with_tenant(
        pool: &SqlitePool,
        branch: Option<&str>,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<PaymentWithTenant>, sqlx::Error> {
        sqlx::query_as::<_, PaymentWithTenant>(&format!(
            "SELECT {PAYMENT_COLUMNS}, t.first_name AS tenant_first_name, t.last_name AS tenant_last_name,
                    t.branch, u.unit_number
             {WITH_TENANT_JOIN}
             WHERE ($1 IS NULL OR t.branch = $1) AND ($2 IS NULL OR p.status = $2)
             ORDER BY p.payment_date DESC, p.created_at DESC"
        ))
        .bind(branch)
        .bind(status)
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_tenant(pool: &SqlitePool, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments p WHERE p.tenant_id = $1
             ORDER BY p.payment_date DESC, p.created_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    /// Payment dates of every confirmed payment made by a tenant
    pub async fn confirmed_dates_for_tenant(
        pool: &SqlitePool,
        tenant_id: Uuid,
    ) -> Result<Vec<NaiveDate>, sqlx::Error> {
        sqlx::query_scalar::<_, NaiveDate>(
            "SELECT payment_date FROM payments WHERE tenant_id = $1 AND status = 'confirmed'
             ORDER BY payment_date",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    /// Move a pending payment to `status`. Returns `None` when the payment
    /// does not exist or is no longer pending.
    pub async fn review_if_pending(
        pool: &SqlitePool,
        id: Uuid,
        status: PaymentStatus,
        reviewed_by: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"UPDATE payments
               SET status = $2, reviewed_by = $3, reviewed_at = datetime('now', 'subsec')
               WHERE id = $1 AND status = 'pending'
               RETURNING id, tenant_id, contract_id, amount_cents, payment_date, payment_mode, status,
                         receipt_path, notes, reviewed_by, reviewed_at, created_at"#,
        )
        .bind(id)
        .bind(status)
        .bind(reviewed_by)
        .fetch_optional(pool)
        .await
    }

    pub async fn count_pending(pool: &SqlitePool, branch: Option<&str>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payments p JOIN tenants t ON t.id = p.tenant_id
             WHERE p.status = 'pending' AND ($1 IS NULL OR t.branch = $1)",
        )
        .bind(branch)
        .fetch_one(pool)
        .await
    }

    pub async fn recent_with_tenant(
        pool: &SqlitePool,
        branch: &str,
        limit: i64,
    ) -> Result<Vec<PaymentWithTenant>, sqlx::Error> {
        sqlx::query_as::<_, PaymentWithTenant>(&format!(
            "SELECT {PAYMENT_COLUMNS}, t.first_name AS tenant_first_name, t.last_name AS tenant_last_name,
                    t.branch, u.unit_number
             {WITH_TENANT_JOIN}
             WHERE t.branch = $1
             ORDER BY p.created_at DESC
             LIMIT $2"
        ))
        .bind(branch)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
