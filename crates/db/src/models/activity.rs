//! Recent-activity feed shown on the caretaker dashboard. Events are read
//! from the payments, maintenance and tenants tables and merged by time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use strum_macros::Display;
use ts_rs::TS;
use utils::money::format_centavos;
use uuid::Uuid;

use super::{maintenance_request::MaintenanceRequest, payment::Payment, tenant::Tenant};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityKind {
    Payment,
    Maintenance,
    NewTenant,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub reference_id: Uuid,
    pub tenant_name: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEvent {
    /// Latest `limit` events of a branch, newest first.
    pub async fn recent_for_branch(
        pool: &SqlitePool,
        branch: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let payments = Payment::recent_with_tenant(pool, branch, limit).await?;
        let requests = MaintenanceRequest::recent_with_tenant(pool, branch, limit).await?;
        let tenants = Tenant::recently_added(pool, branch, limit).await?;

        let mut events: Vec<ActivityEvent> = payments
            .into_iter()
            .map(|p| ActivityEvent {
                kind: ActivityKind::Payment,
                reference_id: p.payment.id,
                tenant_name: p.tenant_name(),
                description: format!(
                    "Payment of {} ({}) is {}",
                    format_centavos(p.payment.amount_cents),
                    p.payment.payment_mode,
                    p.payment.status
                ),
                occurred_at: p.payment.created_at,
            })
            .chain(requests.into_iter().map(|m| ActivityEvent {
                kind: ActivityKind::Maintenance,
                reference_id: m.request.id,
                tenant_name: m.tenant_name(),
                description: format!(
                    "Maintenance request for unit {} ({} priority) is {}",
                    m.unit_number, m.request.priority, m.request.status
                ),
                occurred_at: m.request.created_at,
            }))
            .chain(tenants.into_iter().map(|t| ActivityEvent {
                kind: ActivityKind::NewTenant,
                reference_id: t.id,
                tenant_name: t.full_name(),
                description: "New tenant added".to_string(),
                occurred_at: t.created_at,
            }))
            .collect();

        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        events.truncate(limit.max(0) as usize);
        Ok(events)
    }
}
