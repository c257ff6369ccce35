use db::models::{
    contract::Contract,
    unit::{CreateUnit, Unit, UnitStatus, UpdateUnit},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::validation::non_blank;
use uuid::Uuid;

use super::access::{AccessError, BranchScope};

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("Unit not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Unit number already exists in this branch")]
    DuplicateNumber,
    #[error("Occupied status is set by assigning a tenant")]
    OccupiedIsDerived,
    #[error("Unit has an active contract")]
    HasActiveContract,
    #[error("Unit is referenced by contracts and cannot be deleted")]
    InUse,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct NewUnit {
    pub unit_number: String,
    pub unit_type: String,
    pub monthly_rent_cents: i64,
    pub branch: Option<String>,
}

fn validate_rent(cents: i64) -> Result<(), UnitError> {
    if cents <= 0 {
        return Err(UnitError::Validation("Monthly rent must be greater than zero".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct UnitService {
    pool: SqlitePool,
}

impl UnitService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        scope: &BranchScope,
        status: Option<UnitStatus>,
    ) -> Result<Vec<Unit>, UnitError> {
        Ok(Unit::list(&self.pool, scope.filter(), status).await?)
    }

    pub async fn get(&self, scope: &BranchScope, id: Uuid) -> Result<Unit, UnitError> {
        let unit = Unit::find_by_id(&self.pool, id)
            .await?
            .ok_or(UnitError::NotFound)?;
        scope.ensure(&unit.branch)?;
        Ok(unit)
    }

    pub async fn create(&self, scope: &BranchScope, form: NewUnit) -> Result<Unit, UnitError> {
        let unit_number = non_blank(&form.unit_number)
            .ok_or_else(|| UnitError::Validation("Unit number is required".into()))?
            .to_string();
        let unit_type = non_blank(&form.unit_type)
            .ok_or_else(|| UnitError::Validation("Unit type is required".into()))?
            .to_string();
        validate_rent(form.monthly_rent_cents)?;
        let branch = scope.resolve(form.branch.as_deref())?;

        if Unit::find_by_number(&self.pool, &branch, &unit_number)
            .await?
            .is_some()
        {
            return Err(UnitError::DuplicateNumber);
        }

        let unit = Unit::create(
            &self.pool,
            Uuid::new_v4(),
            &CreateUnit {
                unit_number,
                unit_type,
                monthly_rent_cents: form.monthly_rent_cents,
                branch,
            },
        )
        .await?;
        info!(unit_id = %unit.id, branch = %unit.branch, "Unit created");
        Ok(unit)
    }

    /// Update unit details. Status may only be toggled between `available`
    /// and `maintenance`, and only while no contract is active on the unit.
    pub async fn update(
        &self,
        scope: &BranchScope,
        id: Uuid,
        data: UpdateUnit,
    ) -> Result<Unit, UnitError> {
        let current = self.get(scope, id).await?;

        if let Some(cents) = data.monthly_rent_cents {
            validate_rent(cents)?;
        }
        if let Some(number) = &data.unit_number {
            let number = non_blank(number)
                .ok_or_else(|| UnitError::Validation("Unit number is required".into()))?;
            if let Some(other) = Unit::find_by_number(&self.pool, &current.branch, number).await?
                && other.id != id
            {
                return Err(UnitError::DuplicateNumber);
            }
        }

        let status_change = match data.status {
            Some(UnitStatus::Occupied) => return Err(UnitError::OccupiedIsDerived),
            Some(status) if status != current.status => Some(status),
            _ => None,
        };
        if status_change.is_some()
            && Contract::find_active_by_unit(&self.pool, id).await?.is_some()
        {
            return Err(UnitError::HasActiveContract);
        }

        let mut unit = Unit::update_details(&self.pool, id, &data)
            .await?
            .ok_or(UnitError::NotFound)?;
        if let Some(status) = status_change {
            Unit::set_status(&self.pool, id, status).await?;
            unit.status = status;
            info!(unit_id = %id, status = %status, "Unit status changed");
        }
        Ok(unit)
    }

    pub async fn delete(&self, scope: &BranchScope, id: Uuid) -> Result<(), UnitError> {
        self.get(scope, id).await?;
        if Unit::has_contracts(&self.pool, id).await? {
            return Err(UnitError::InUse);
        }
        Unit::delete(&self.pool, id).await?;
        info!(unit_id = %id, "Unit deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;
    use crate::services::{
        occupancy::OccupancyService,
        test_support::{date, seed_tenant},
    };

    fn new_unit(number: &str, rent: i64) -> NewUnit {
        NewUnit {
            unit_number: number.into(),
            unit_type: "1BR".into(),
            monthly_rent_cents: rent,
            branch: None,
        }
    }

    #[tokio::test]
    async fn rent_must_be_positive_and_numbers_unique() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = UnitService::new(db.pool.clone());
        let scope = BranchScope::Branch("cainta".into());

        assert!(matches!(
            service.create(&scope, new_unit("301", 0)).await,
            Err(UnitError::Validation(_))
        ));
        service.create(&scope, new_unit("301", 1_200_000)).await.unwrap();
        assert!(matches!(
            service.create(&scope, new_unit("301", 1_200_000)).await,
            Err(UnitError::DuplicateNumber)
        ));
    }

    #[tokio::test]
    async fn status_toggle_rules() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = UnitService::new(db.pool.clone());
        let scope = BranchScope::Branch("cainta".into());
        let unit = service.create(&scope, new_unit("301", 1_200_000)).await.unwrap();

        let occupied = UpdateUnit {
            status: Some(UnitStatus::Occupied),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&scope, unit.id, occupied).await,
            Err(UnitError::OccupiedIsDerived)
        ));

        let parked = service
            .update(
                &scope,
                unit.id,
                UpdateUnit {
                    status: Some(UnitStatus::Maintenance),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(parked.status, UnitStatus::Maintenance);

        service
            .update(
                &scope,
                unit.id,
                UpdateUnit {
                    status: Some(UnitStatus::Available),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let tenant = seed_tenant(&db.pool, "mara@example.com", "cainta").await;
        OccupancyService::new(db.pool.clone())
            .assign_unit(tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
        assert!(matches!(
            service
                .update(
                    &scope,
                    unit.id,
                    UpdateUnit {
                        status: Some(UnitStatus::Maintenance),
                        ..Default::default()
                    },
                )
                .await,
            Err(UnitError::HasActiveContract)
        ));
        assert!(matches!(
            service.delete(&scope, unit.id).await,
            Err(UnitError::InUse)
        ));
    }
}
