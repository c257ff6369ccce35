//! Overdue rent computation.
//!
//! A month is overdue when its due date has passed and no confirmed payment
//! was dated inside that month. There is no proration, partial payment or
//! grace period.

use std::collections::HashSet;

use chrono::{Datelike, Months, NaiveDate};
use db::models::{contract::Contract, payment::Payment, tenant::Tenant, unit::Unit};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

pub const DEFAULT_DUE_DAY: u32 = 15;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Tenant not found")]
    TenantNotFound,
    #[error("No Contract")]
    NoContract,
    #[error("Unit not found")]
    UnitNotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct OverdueMonth {
    /// First day of the month
    pub month: NaiveDate,
    pub due_date: NaiveDate,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
pub struct OverdueBalance {
    pub months: Vec<OverdueMonth>,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct TenantBalance {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub unit_number: Option<String>,
    pub monthly_rent_cents: i64,
    pub balance: OverdueBalance,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Due date inside the month starting at `month`, clamped to the month's
/// last day.
pub fn due_date_for(month: NaiveDate, due_day: u32) -> NaiveDate {
    let month = first_of_month(month);
    let last_day = month
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28);
    month.with_day(due_day.clamp(1, last_day)).unwrap_or(month)
}

pub fn overdue_balance(
    start_date: NaiveDate,
    monthly_rent_cents: i64,
    confirmed_payment_dates: &[NaiveDate],
    today: NaiveDate,
    due_day: u32,
) -> OverdueBalance {
    if start_date > today {
        return OverdueBalance::default();
    }

    let paid: HashSet<(i32, u32)> = confirmed_payment_dates
        .iter()
        .map(|d| (d.year(), d.month()))
        .collect();

    let last = first_of_month(today);
    let mut month = first_of_month(start_date);
    let mut months = Vec::new();

    while month <= last {
        let due_date = due_date_for(month, due_day);
        if due_date < today && !paid.contains(&(month.year(), month.month())) {
            months.push(OverdueMonth {
                month,
                due_date,
                amount_cents: monthly_rent_cents,
            });
        }
        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }

    let total_cents = monthly_rent_cents * months.len() as i64;
    OverdueBalance {
        months,
        total_cents,
    }
}

#[derive(Clone)]
pub struct LedgerService {
    pool: SqlitePool,
    due_day: u32,
}

impl LedgerService {
    pub fn new(pool: SqlitePool, due_day: u32) -> Self {
        Self { pool, due_day }
    }

    pub fn due_day(&self) -> u32 {
        self.due_day
    }

    pub async fn tenant_balance(
        &self,
        tenant_id: Uuid,
        today: NaiveDate,
    ) -> Result<TenantBalance, LedgerError> {
        let tenant = Tenant::find_by_id(&self.pool, tenant_id)
            .await?
            .ok_or(LedgerError::TenantNotFound)?;
        let contract = Contract::find_active_by_tenant(&self.pool, tenant_id)
            .await?
            .ok_or(LedgerError::NoContract)?;
        let unit = Unit::find_by_id(&self.pool, contract.unit_id)
            .await?
            .ok_or(LedgerError::UnitNotFound)?;
        let paid = Payment::confirmed_dates_for_tenant(&self.pool, tenant_id).await?;

        Ok(TenantBalance {
            tenant_id,
            tenant_name: tenant.full_name(),
            unit_number: Some(unit.unit_number),
            monthly_rent_cents: unit.monthly_rent_cents,
            balance: overdue_balance(
                contract.start_date,
                unit.monthly_rent_cents,
                &paid,
                today,
                self.due_day,
            ),
        })
    }

    /// Balances of every active tenant in a branch holding a contract,
    /// largest first.
    pub async fn branch_overdue(
        &self,
        branch: &str,
        today: NaiveDate,
    ) -> Result<Vec<TenantBalance>, LedgerError> {
        let tenants = Tenant::list_active_with_unit(&self.pool, branch).await?;
        let mut balances = Vec::with_capacity(tenants.len());

        for row in tenants {
            let (Some(start_date), Some(rent)) = (row.contract_start_date, row.monthly_rent_cents)
            else {
                continue;
            };
            let paid = Payment::confirmed_dates_for_tenant(&self.pool, row.tenant.id).await?;
            balances.push(TenantBalance {
                tenant_id: row.tenant.id,
                tenant_name: row.tenant.full_name(),
                unit_number: row.unit_number.clone(),
                monthly_rent_cents: rent,
                balance: overdue_balance(start_date, rent, &paid, today, self.due_day),
            });
        }

        balances.sort_by(|a, b| b.balance.total_cents.cmp(&a.balance.total_cents));
        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn unpaid_months_past_due_are_counted() {
        let balance = overdue_balance(date(2025, 1, 10), 1_000_000, &[], date(2025, 3, 20), 15);
        assert_eq!(balance.months.len(), 3);
        assert_eq!(balance.total_cents, 3_000_000);
        assert_eq!(balance.months[0].due_date, date(2025, 1, 15));
    }

    #[test]
    fn current_month_counts_only_after_due_date() {
        let before = overdue_balance(date(2025, 3, 1), 500_000, &[], date(2025, 3, 15), 15);
        assert!(before.months.is_empty());
        let after = overdue_balance(date(2025, 3, 1), 500_000, &[], date(2025, 3, 16), 15);
        assert_eq!(after.total_cents, 500_000);
    }

    #[test]
    fn any_confirmed_payment_in_the_month_settles_it() {
        let paid = [date(2025, 2, 28)];
        let balance = overdue_balance(date(2025, 1, 1), 100, &paid, date(2025, 3, 31), 15);
        let months: Vec<u32> = balance.months.iter().map(|m| m.month.month()).collect();
        assert_eq!(months, vec![1, 3]);
        assert_eq!(balance.total_cents, 200);
    }

    #[test]
    fn due_day_is_clamped_to_short_months() {
        assert_eq!(due_date_for(date(2025, 2, 1), 31), date(2025, 2, 28));
        assert_eq!(due_date_for(date(2024, 2, 1), 31), date(2024, 2, 29));
        assert_eq!(due_date_for(date(2025, 4, 1), 0), date(2025, 4, 1));
    }

    #[test]
    fn future_start_yields_nothing() {
        let balance = overdue_balance(date(2025, 6, 1), 100, &[], date(2025, 5, 1), 15);
        assert_eq!(balance, OverdueBalance::default());
    }
}
