//! Aggregated read models behind the three role dashboards.

use chrono::NaiveDate;
use db::models::{
    activity::ActivityEvent,
    contract::Contract,
    maintenance_request::{MaintenanceRequest, MaintenanceRequestWithTenant},
    notification::Notification,
    payment::{Payment, PaymentWithTenant},
    profile::{Profile, UserRole},
    tenant::{Tenant, TenantStatus, TenantWithUnit},
    unit::{Unit, UnitStatusCounts},
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;

use super::ledger::{LedgerError, LedgerService, OverdueBalance, overdue_balance};

pub const RECENT_ACTIVITY_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("No tenant record is linked to this account")]
    TenantRecordMissing,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct TenantDashboard {
    pub tenant: Tenant,
    pub contract: Option<Contract>,
    pub unit: Option<Unit>,
    pub payments: Vec<Payment>,
    pub balance: Option<OverdueBalance>,
    pub maintenance_requests: Vec<MaintenanceRequest>,
    pub notifications: Vec<Notification>,
    pub unread_notifications: usize,
}

#[derive(Debug, Clone, Default, Serialize, TS)]
pub struct BranchStats {
    pub units: UnitStatusCounts,
    pub active_tenants: i64,
    pub pending_payments: i64,
    pub open_maintenance: i64,
    pub overdue_total_cents: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ManagerDashboard {
    pub branch: String,
    pub tenants: Vec<TenantWithUnit>,
    pub units: Vec<Unit>,
    pub payments: Vec<PaymentWithTenant>,
    pub maintenance_requests: Vec<MaintenanceRequestWithTenant>,
    pub recent_activity: Vec<ActivityEvent>,
    pub stats: BranchStats,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct BranchSummary {
    pub branch: String,
    pub stats: BranchStats,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SuperAdminOverview {
    pub branches: Vec<BranchSummary>,
    pub managers: Vec<Profile>,
}

#[derive(Clone)]
pub struct DashboardService {
    pool: SqlitePool,
    ledger: LedgerService,
}

impl DashboardService {
    pub fn new(pool: SqlitePool, due_day: u32) -> Self {
        Self {
            ledger: LedgerService::new(pool.clone(), due_day),
            pool,
        }
    }

    /// Tenant record of a signed-in tenant: linked by profile, falling back
    /// to the account e-mail for records created before the account existed.
    pub async fn tenant_for_profile(&self, profile: &Profile) -> Result<Tenant, DashboardError> {
        if let Some(tenant) = Tenant::find_by_profile_id(&self.pool, profile.id).await? {
            return Ok(tenant);
        }
        Tenant::find_by_email(&self.pool, &profile.email)
            .await?
            .ok_or(DashboardError::TenantRecordMissing)
    }

    pub async fn tenant_dashboard(
        &self,
        profile: &Profile,
        today: NaiveDate,
    ) -> Result<TenantDashboard, DashboardError> {
        let tenant = self.tenant_for_profile(profile).await?;
        let contract = Contract::find_active_by_tenant(&self.pool, tenant.id).await?;
        let unit = match &contract {
            Some(contract) => Unit::find_by_id(&self.pool, contract.unit_id).await?,
            None => None,
        };
        let payments = Payment::list_by_tenant(&self.pool, tenant.id).await?;

        let balance = match (&contract, &unit) {
            (Some(contract), Some(unit)) => {
                let paid = Payment::confirmed_dates_for_tenant(&self.pool, tenant.id).await?;
                Some(overdue_balance(
                    contract.start_date,
                    unit.monthly_rent_cents,
                    &paid,
                    today,
                    self.ledger.due_day(),
                ))
            }
            _ => None,
        };

        let maintenance_requests = MaintenanceRequest::list_by_tenant(&self.pool, tenant.id).await?;
        let notifications = Notification::list_by_tenant(&self.pool, tenant.id).await?;
        let unread_notifications = notifications.iter().filter(|n| n.read_at.is_none()).count();

        Ok(TenantDashboard {
            tenant,
            contract,
            unit,
            payments,
            balance,
            maintenance_requests,
            notifications,
            unread_notifications,
        })
    }

    pub async fn branch_stats(&self, branch: &str, today: NaiveDate) -> Result<BranchStats, DashboardError> {
        let overdue = self.ledger.branch_overdue(branch, today).await?;
        Ok(BranchStats {
            units: Unit::status_counts(&self.pool, Some(branch)).await?,
            active_tenants: Tenant::count_by_status(&self.pool, branch, TenantStatus::Active).await?,
            pending_payments: Payment::count_pending(&self.pool, Some(branch)).await?,
            open_maintenance: MaintenanceRequest::count_open(&self.pool, Some(branch)).await?,
            overdue_total_cents: overdue.iter().map(|b| b.balance.total_cents).sum(),
        })
    }

    pub async fn manager_dashboard(
        &self,
        branch: &str,
        today: NaiveDate,
    ) -> Result<ManagerDashboard, DashboardError> {
        Ok(ManagerDashboard {
            branch: branch.to_string(),
            tenants: Tenant::list_with_unit(&self.pool, Some(branch)).await?,
            units: Unit::list(&self.pool, Some(branch), None).await?,
            payments: Payment::list_with_tenant(&self.pool, Some(branch), None).await?,
            maintenance_requests: MaintenanceRequest::list_with_tenant(&self.pool, Some(branch), None)
                .await?,
            recent_activity: ActivityEvent::recent_for_branch(&self.pool, branch, RECENT_ACTIVITY_LIMIT)
                .await?,
            stats: self.branch_stats(branch, today).await?,
        })
    }

    pub async fn super_admin_overview(&self, today: NaiveDate) -> Result<SuperAdminOverview, DashboardError> {
        let managers = Profile::list_by_role(&self.pool, UserRole::ApartmentManager).await?;

        let mut names = Unit::branches(&self.pool).await?;
        names.extend(managers.iter().filter_map(|m| m.branch.clone()));
        names.sort();
        names.dedup();

        let mut branches = Vec::with_capacity(names.len());
        for branch in names {
            let stats = self.branch_stats(&branch, today).await?;
            branches.push(BranchSummary { branch, stats });
        }

        Ok(SuperAdminOverview { branches, managers })
    }
}
