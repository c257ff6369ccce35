//! Single authority for contract changes and the unit statuses derived from
//! them. Each operation runs in one transaction and recomputes the status of
//! every unit it touched before committing.

use chrono::NaiveDate;
use db::models::{
    contract::{Contract, ContractStatus},
    tenant::{Tenant, TenantStatus},
    unit::{Unit, UnitStatus},
};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OccupancyError {
    #[error("Tenant not found")]
    TenantNotFound,
    #[error("Unit not found")]
    UnitNotFound,
    #[error("Contract not found")]
    ContractNotFound,
    #[error("Unit is under maintenance")]
    UnitUnderMaintenance,
    #[error("Unit is already occupied by another tenant")]
    UnitOccupied,
    #[error("Tenant already has an active contract")]
    TenantHasContract,
    #[error("Tenant is inactive")]
    TenantInactive,
    #[error("Unit belongs to a different branch than the tenant")]
    BranchMismatch,
    #[error("Contract end date must not be before its start date")]
    InvalidDates,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct ContractChanges {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ContractStatus>,
    pub unit_id: Option<Uuid>,
}

/// Derive a unit's status from its contracts: an active contract means
/// `occupied`; otherwise `available`, unless staff parked it in
/// `maintenance`.
pub async fn sync_unit_status(
    conn: &mut SqliteConnection,
    unit_id: Uuid,
) -> Result<Option<UnitStatus>, sqlx::Error> {
    let Some(unit) = Unit::find_by_id(&mut *conn, unit_id).await? else {
        return Ok(None);
    };
    let has_active = Contract::find_active_by_unit(&mut *conn, unit_id)
        .await?
        .is_some();

    let status = match (has_active, unit.status) {
        (true, _) => UnitStatus::Occupied,
        (false, UnitStatus::Maintenance) => UnitStatus::Maintenance,
        (false, _) => UnitStatus::Available,
    };

    if status != unit.status {
        Unit::set_status(&mut *conn, unit_id, status).await?;
        debug!(unit_id = %unit_id, from = %unit.status, to = %status, "Unit status synced");
    }
    Ok(Some(status))
}

/// Checks that `unit` can take an active contract held by `tenant_id`
/// (`contract_id` is the contract being moved or reactivated, if any).
async fn ensure_unit_free(
    conn: &mut SqliteConnection,
    unit: &Unit,
    contract_id: Option<Uuid>,
) -> Result<(), OccupancyError> {
    if unit.status == UnitStatus::Maintenance {
        return Err(OccupancyError::UnitUnderMaintenance);
    }
    if let Some(holder) = Contract::find_active_by_unit(&mut *conn, unit.id).await?
        && Some(holder.id) != contract_id
    {
        return Err(OccupancyError::UnitOccupied);
    }
    Ok(())
}

#[derive(Clone)]
pub struct OccupancyService {
    pool: SqlitePool,
}

impl OccupancyService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Put a tenant in a unit. An existing active contract is moved to the
    /// new unit; otherwise a new contract is created.
    pub async fn assign_unit(
        &self,
        tenant_id: Uuid,
        unit_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Contract, OccupancyError> {
        if end_date < start_date {
            return Err(OccupancyError::InvalidDates);
        }

        let mut tx = self.pool.begin().await?;

        let tenant = Tenant::find_by_id(&mut *tx, tenant_id)
            .await?
            .ok_or(OccupancyError::TenantNotFound)?;
        if tenant.status == TenantStatus::Inactive {
            return Err(OccupancyError::TenantInactive);
        }
        let unit = Unit::find_by_id(&mut *tx, unit_id)
            .await?
            .ok_or(OccupancyError::UnitNotFound)?;
        if unit.branch != tenant.branch {
            return Err(OccupancyError::BranchMismatch);
        }

        let existing = Contract::find_active_by_tenant(&mut *tx, tenant_id).await?;
        ensure_unit_free(&mut tx, &unit, existing.as_ref().map(|c| c.id)).await?;

        let (contract_id, previous_unit) = match existing {
            Some(contract) => {
                if contract.unit_id != unit_id {
                    Contract::set_unit(&mut *tx, contract.id, unit_id).await?;
                }
                Contract::set_dates(&mut *tx, contract.id, start_date, end_date).await?;
                let previous = (contract.unit_id != unit_id).then_some(contract.unit_id);
                (contract.id, previous)
            }
            None => {
                let contract =
                    Contract::create(&mut *tx, Uuid::new_v4(), tenant_id, unit_id, start_date, end_date)
                        .await?;
                (contract.id, None)
            }
        };

        sync_unit_status(&mut tx, unit_id).await?;
        if let Some(previous) = previous_unit {
            sync_unit_status(&mut tx, previous).await?;
        }

        let contract = Contract::find_by_id(&mut *tx, contract_id)
            .await?
            .ok_or(OccupancyError::ContractNotFound)?;
        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            unit_id = %unit_id,
            previous_unit = ?previous_unit,
            "Unit assigned"
        );
        Ok(contract)
    }

    pub async fn update_contract(
        &self,
        contract_id: Uuid,
        changes: ContractChanges,
    ) -> Result<Contract, OccupancyError> {
        let mut tx = self.pool.begin().await?;

        let contract = Contract::find_by_id(&mut *tx, contract_id)
            .await?
            .ok_or(OccupancyError::ContractNotFound)?;

        let start_date = changes.start_date.unwrap_or(contract.start_date);
        let end_date = changes.end_date.unwrap_or(contract.end_date);
        if end_date < start_date {
            return Err(OccupancyError::InvalidDates);
        }

        let target_unit = changes.unit_id.unwrap_or(contract.unit_id);
        let target_status = changes.status.unwrap_or(contract.status);
        let unit_changed = target_unit != contract.unit_id;
        let reactivating =
            contract.status == ContractStatus::Inactive && target_status == ContractStatus::Active;

        if unit_changed || reactivating {
            let tenant = Tenant::find_by_id(&mut *tx, contract.tenant_id)
                .await?
                .ok_or(OccupancyError::TenantNotFound)?;
            let unit = Unit::find_by_id(&mut *tx, target_unit)
                .await?
                .ok_or(OccupancyError::UnitNotFound)?;
            if unit.branch != tenant.branch {
                return Err(OccupancyError::BranchMismatch);
            }
            if target_status == ContractStatus::Active {
                if tenant.status == TenantStatus::Inactive {
                    return Err(OccupancyError::TenantInactive);
                }
                ensure_unit_free(&mut tx, &unit, Some(contract.id)).await?;
            }
        }
        if reactivating
            && let Some(other) = Contract::find_active_by_tenant(&mut *tx, contract.tenant_id).await?
            && other.id != contract.id
        {
            return Err(OccupancyError::TenantHasContract);
        }

        if start_date != contract.start_date || end_date != contract.end_date {
            Contract::set_dates(&mut *tx, contract.id, start_date, end_date).await?;
        }
        if unit_changed {
            Contract::set_unit(&mut *tx, contract.id, target_unit).await?;
        }
        if target_status != contract.status {
            Contract::set_status(&mut *tx, contract.id, target_status).await?;
        }

        sync_unit_status(&mut tx, contract.unit_id).await?;
        if unit_changed {
            sync_unit_status(&mut tx, target_unit).await?;
        }

        let updated = Contract::find_by_id(&mut *tx, contract.id)
            .await?
            .ok_or(OccupancyError::ContractNotFound)?;
        tx.commit().await?;

        info!(contract_id = %contract.id, status = %updated.status, "Contract updated");
        Ok(updated)
    }

    /// Deactivating a tenant ends their active contract. Reactivating revives
    /// their latest contract when its unit is still free; otherwise the
    /// tenant becomes active without a unit.
    pub async fn set_tenant_status(
        &self,
        tenant_id: Uuid,
        status: TenantStatus,
    ) -> Result<Tenant, OccupancyError> {
        let mut tx = self.pool.begin().await?;

        let tenant = Tenant::find_by_id(&mut *tx, tenant_id)
            .await?
            .ok_or(OccupancyError::TenantNotFound)?;

        match status {
            TenantStatus::Inactive => {
                if let Some(contract) = Contract::find_active_by_tenant(&mut *tx, tenant_id).await? {
                    Contract::set_status(&mut *tx, contract.id, ContractStatus::Inactive).await?;
                    sync_unit_status(&mut tx, contract.unit_id).await?;
                }
            }
            TenantStatus::Active => {
                let has_active = Contract::find_active_by_tenant(&mut *tx, tenant_id)
                    .await?
                    .is_some();
                if !has_active
                    && let Some(latest) = Contract::find_latest_by_tenant(&mut *tx, tenant_id).await?
                {
                    let unit = Unit::find_by_id(&mut *tx, latest.unit_id).await?;
                    let free = match &unit {
                        Some(unit) => ensure_unit_free(&mut tx, unit, Some(latest.id)).await.is_ok(),
                        None => false,
                    };
                    if free {
                        Contract::set_status(&mut *tx, latest.id, ContractStatus::Active).await?;
                        sync_unit_status(&mut tx, latest.unit_id).await?;
                    } else {
                        info!(
                            tenant_id = %tenant_id,
                            unit_id = %latest.unit_id,
                            "Previous unit is no longer free; tenant reactivated without a unit"
                        );
                    }
                }
            }
        }

        if tenant.status != status {
            Tenant::set_status(&mut *tx, tenant_id, status).await?;
        }
        let updated = Tenant::find_by_id(&mut *tx, tenant_id)
            .await?
            .ok_or(OccupancyError::TenantNotFound)?;
        tx.commit().await?;

        info!(tenant_id = %tenant_id, status = %status, "Tenant status changed");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;
    use crate::services::test_support::{date, seed_tenant, seed_unit};

    async fn unit_status(pool: &SqlitePool, id: Uuid) -> UnitStatus {
        Unit::find_by_id(pool, id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn assigning_marks_unit_occupied() {
        let db = DBService::new_in_memory().await.unwrap();
        let tenant = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let unit = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let service = OccupancyService::new(db.pool.clone());

        let contract = service
            .assign_unit(tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
        assert_eq!(contract.status, ContractStatus::Active);
        assert_eq!(unit_status(&db.pool, unit.id).await, UnitStatus::Occupied);
    }

    #[tokio::test]
    async fn moving_frees_the_previous_unit() {
        let db = DBService::new_in_memory().await.unwrap();
        let tenant = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let first = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let second = seed_unit(&db.pool, "102", "cainta", 900_000).await;
        let service = OccupancyService::new(db.pool.clone());

        let original = service
            .assign_unit(tenant.id, first.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
        let moved = service
            .assign_unit(tenant.id, second.id, date(2025, 2, 1), date(2026, 1, 31))
            .await
            .unwrap();

        assert_eq!(moved.id, original.id);
        assert_eq!(moved.unit_id, second.id);
        assert_eq!(unit_status(&db.pool, first.id).await, UnitStatus::Available);
        assert_eq!(unit_status(&db.pool, second.id).await, UnitStatus::Occupied);
    }

    #[tokio::test]
    async fn occupied_and_maintenance_units_are_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        let ana = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let ben = seed_tenant(&db.pool, "ben@example.com", "cainta").await;
        let unit = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let parked = seed_unit(&db.pool, "102", "cainta", 850_000).await;
        Unit::set_status(&db.pool, parked.id, UnitStatus::Maintenance)
            .await
            .unwrap();
        let service = OccupancyService::new(db.pool.clone());

        service
            .assign_unit(ana.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
        let err = service
            .assign_unit(ben.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap_err();
        assert!(matches!(err, OccupancyError::UnitOccupied));

        let err = service
            .assign_unit(ben.id, parked.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap_err();
        assert!(matches!(err, OccupancyError::UnitUnderMaintenance));
    }

    #[tokio::test]
    async fn deactivating_tenant_frees_unit_and_reactivation_restores_it() {
        let db = DBService::new_in_memory().await.unwrap();
        let tenant = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let unit = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let service = OccupancyService::new(db.pool.clone());
        service
            .assign_unit(tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();

        let inactive = service
            .set_tenant_status(tenant.id, TenantStatus::Inactive)
            .await
            .unwrap();
        assert_eq!(inactive.status, TenantStatus::Inactive);
        assert_eq!(unit_status(&db.pool, unit.id).await, UnitStatus::Available);

        service
            .set_tenant_status(tenant.id, TenantStatus::Active)
            .await
            .unwrap();
        assert_eq!(unit_status(&db.pool, unit.id).await, UnitStatus::Occupied);
    }

    #[tokio::test]
    async fn reactivation_skips_a_unit_taken_meanwhile() {
        let db = DBService::new_in_memory().await.unwrap();
        let ana = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let ben = seed_tenant(&db.pool, "ben@example.com", "cainta").await;
        let unit = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let service = OccupancyService::new(db.pool.clone());

        service
            .assign_unit(ana.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
        service
            .set_tenant_status(ana.id, TenantStatus::Inactive)
            .await
            .unwrap();
        service
            .assign_unit(ben.id, unit.id, date(2025, 3, 1), date(2025, 12, 31))
            .await
            .unwrap();

        let ana = service
            .set_tenant_status(ana.id, TenantStatus::Active)
            .await
            .unwrap();
        assert_eq!(ana.status, TenantStatus::Active);
        assert!(
            Contract::find_active_by_tenant(&db.pool, ana.id)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(unit_status(&db.pool, unit.id).await, UnitStatus::Occupied);
    }

    #[tokio::test]
    async fn ending_a_contract_frees_its_unit() {
        let db = DBService::new_in_memory().await.unwrap();
        let tenant = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let unit = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let service = OccupancyService::new(db.pool.clone());
        let contract = service
            .assign_unit(tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();

        let ended = service
            .update_contract(
                contract.id,
                ContractChanges {
                    status: Some(ContractStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(ended.status, ContractStatus::Inactive);
        assert_eq!(unit_status(&db.pool, unit.id).await, UnitStatus::Available);

        let err = service
            .update_contract(
                contract.id,
                ContractChanges {
                    end_date: Some(date(2024, 12, 1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OccupancyError::InvalidDates));
    }

    #[tokio::test]
    async fn changing_a_contracts_unit_moves_occupancy() {
        let db = DBService::new_in_memory().await.unwrap();
        let tenant = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let first = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let second = seed_unit(&db.pool, "102", "cainta", 900_000).await;
        let service = OccupancyService::new(db.pool.clone());
        let contract = service
            .assign_unit(tenant.id, first.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();

        let moved = service
            .update_contract(
                contract.id,
                ContractChanges {
                    unit_id: Some(second.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.unit_id, second.id);
        assert_eq!(unit_status(&db.pool, first.id).await, UnitStatus::Available);
        assert_eq!(unit_status(&db.pool, second.id).await, UnitStatus::Occupied);
    }

    #[tokio::test]
    async fn contract_cannot_move_to_another_branch() {
        let db = DBService::new_in_memory().await.unwrap();
        let tenant = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let home = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let away = seed_unit(&db.pool, "201", "cubao", 850_000).await;
        let service = OccupancyService::new(db.pool.clone());

        let err = service
            .assign_unit(tenant.id, away.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap_err();
        assert!(matches!(err, OccupancyError::BranchMismatch));

        let contract = service
            .assign_unit(tenant.id, home.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
        let err = service
            .update_contract(
                contract.id,
                ContractChanges {
                    unit_id: Some(away.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OccupancyError::BranchMismatch));

        let unchanged = Contract::find_by_id(&db.pool, contract.id).await.unwrap().unwrap();
        assert_eq!(unchanged.unit_id, home.id);
        assert_eq!(unit_status(&db.pool, home.id).await, UnitStatus::Occupied);
        assert_eq!(unit_status(&db.pool, away.id).await, UnitStatus::Available);
    }

    #[tokio::test]
    async fn reactivating_a_contract_reoccupies_its_unit() {
        let db = DBService::new_in_memory().await.unwrap();
        let tenant = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let unit = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let service = OccupancyService::new(db.pool.clone());
        let contract = service
            .assign_unit(tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
        let status = |status| ContractChanges {
            status: Some(status),
            ..Default::default()
        };

        service
            .update_contract(contract.id, status(ContractStatus::Inactive))
            .await
            .unwrap();
        assert_eq!(unit_status(&db.pool, unit.id).await, UnitStatus::Available);

        let revived = service
            .update_contract(contract.id, status(ContractStatus::Active))
            .await
            .unwrap();
        assert_eq!(revived.status, ContractStatus::Active);
        assert_eq!(unit_status(&db.pool, unit.id).await, UnitStatus::Occupied);
    }

    #[tokio::test]
    async fn reactivation_conflicts_are_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        let ana = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let ben = seed_tenant(&db.pool, "ben@example.com", "cainta").await;
        let first = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let second = seed_unit(&db.pool, "102", "cainta", 850_000).await;
        let third = seed_unit(&db.pool, "103", "cainta", 850_000).await;
        let service = OccupancyService::new(db.pool.clone());
        let status = |status| ContractChanges {
            status: Some(status),
            ..Default::default()
        };

        let old = service
            .assign_unit(ana.id, first.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
        service
            .update_contract(old.id, status(ContractStatus::Inactive))
            .await
            .unwrap();

        // Someone else took the unit
        service
            .assign_unit(ben.id, first.id, date(2025, 3, 1), date(2025, 12, 31))
            .await
            .unwrap();
        let err = service
            .update_contract(old.id, status(ContractStatus::Active))
            .await
            .unwrap_err();
        assert!(matches!(err, OccupancyError::UnitOccupied));

        // The tenant already lives elsewhere
        service
            .assign_unit(ana.id, second.id, date(2025, 3, 1), date(2025, 12, 31))
            .await
            .unwrap();
        let err = service
            .update_contract(
                old.id,
                ContractChanges {
                    status: Some(ContractStatus::Active),
                    unit_id: Some(third.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OccupancyError::TenantHasContract));
        assert_eq!(unit_status(&db.pool, third.id).await, UnitStatus::Available);
    }

    #[tokio::test]
    async fn inactive_tenant_contract_cannot_be_reactivated() {
        let db = DBService::new_in_memory().await.unwrap();
        let tenant = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let unit = seed_unit(&db.pool, "101", "cainta", 850_000).await;
        let service = OccupancyService::new(db.pool.clone());
        let contract = service
            .assign_unit(tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
        service
            .set_tenant_status(tenant.id, TenantStatus::Inactive)
            .await
            .unwrap();

        let err = service
            .update_contract(
                contract.id,
                ContractChanges {
                    status: Some(ContractStatus::Active),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OccupancyError::TenantInactive));
        assert_eq!(unit_status(&db.pool, unit.id).await, UnitStatus::Available);
    }
}
