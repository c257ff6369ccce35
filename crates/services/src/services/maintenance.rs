use db::models::{
    contract::Contract,
    maintenance_request::{
        MaintenancePriority, MaintenanceRequest, MaintenanceRequestWithTenant, MaintenanceStatus,
    },
    tenant::Tenant,
    unit::Unit,
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
pub enum MaintenanceError {
    #[error("Maintenance request not found")]
    NotFound,
    #[error("No Unit")]
    NoUnit,
    #[error("{0}")]
    Validation(String),
    #[error("Cannot change a {from} request to {to}")]
    InvalidTransition {
        from: MaintenanceStatus,
        to: MaintenanceStatus,
    },
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct NewMaintenanceRequest {
    pub description: String,
    #[serde(default)]
    pub priority: MaintenancePriority,
}

/// `completed` is terminal; open requests may move forward or be reopened
/// from `in_progress`.
pub fn can_transition(from: MaintenanceStatus, to: MaintenanceStatus) -> bool {
    use MaintenanceStatus::*;
    matches!(
        (from, to),
        (Pending, InProgress) | (Pending, Completed) | (InProgress, Completed) | (InProgress, Pending)
    )
}

#[derive(Clone)]
pub struct MaintenanceService {
    pool: SqlitePool,
}

impl MaintenanceService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Filed against the unit of the tenant's active contract.
    pub async fn create_request(
        &self,
        tenant: &Tenant,
        request: NewMaintenanceRequest,
    ) -> Result<MaintenanceRequest, MaintenanceError> {
        let description = non_blank(&request.description)
            .ok_or_else(|| MaintenanceError::Validation("Please describe the issue".into()))?;
        let contract = Contract::find_active_by_tenant(&self.pool, tenant.id)
            .await?
            .ok_or(MaintenanceError::NoUnit)?;

        let created = MaintenanceRequest::create(
            &self.pool,
            Uuid::new_v4(),
            tenant.id,
            contract.unit_id,
            description,
            request.priority,
        )
        .await?;
        info!(request_id = %created.id, tenant_id = %tenant.id, priority = %created.priority, "Maintenance request filed");
        Ok(created)
    }

    async fn find_scoped(
        &self,
        scope: &BranchScope,
        id: Uuid,
    ) -> Result<MaintenanceRequest, MaintenanceError> {
        let request = MaintenanceRequest::find_by_id(&self.pool, id)
            .await?
            .ok_or(MaintenanceError::NotFound)?;
        let unit = Unit::find_by_id(&self.pool, request.unit_id)
            .await?
            .ok_or(MaintenanceError::NotFound)?;
        scope.ensure(&unit.branch)?;
        Ok(request)
    }

    pub async fn update_status(
        &self,
        scope: &BranchScope,
        id: Uuid,
        status: MaintenanceStatus,
    ) -> Result<MaintenanceRequest, MaintenanceError> {
        let current = self.find_scoped(scope, id).await?;
        if !can_transition(current.status, status) {
            return Err(MaintenanceError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }
        let updated = MaintenanceRequest::update_status(&self.pool, id, status)
            .await?
            .ok_or(MaintenanceError::NotFound)?;
        info!(request_id = %id, from = %current.status, to = %status, "Maintenance status changed");
        Ok(updated)
    }

    pub async fn update_priority(
        &self,
        scope: &BranchScope,
        id: Uuid,
        priority: MaintenancePriority,
    ) -> Result<MaintenanceRequest, MaintenanceError> {
        self.find_scoped(scope, id).await?;
        MaintenanceRequest::update_priority(&self.pool, id, priority)
            .await?
            .ok_or(MaintenanceError::NotFound)
    }

    pub async fn list_for_branch(
        &self,
        scope: &BranchScope,
        status: Option<MaintenanceStatus>,
    ) -> Result<Vec<MaintenanceRequestWithTenant>, MaintenanceError> {
        Ok(MaintenanceRequest::list_with_tenant(&self.pool, scope.filter(), status).await?)
    }

    pub async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<MaintenanceRequest>, MaintenanceError> {
        Ok(MaintenanceRequest::list_by_tenant(&self.pool, tenant_id).await?)
    }

    pub async fn delete(&self, scope: &BranchScope, id: Uuid) -> Result<(), MaintenanceError> {
        self.find_scoped(scope, id).await?;
        MaintenanceRequest::delete(&self.pool, id).await?;
        info!(request_id = %id, "Maintenance request deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;
    use crate::services::{
        occupancy::OccupancyService,
        test_support::{date, seed_tenant, seed_unit},
    };

    fn leak() -> NewMaintenanceRequest {
        NewMaintenanceRequest {
            description: "Leaking faucet in the kitchen".into(),
            priority: MaintenancePriority::High,
        }
    }

    #[test]
    fn transition_table() {
        use MaintenanceStatus::*;
        assert!(can_transition(Pending, InProgress));
        assert!(can_transition(Pending, Completed));
        assert!(can_transition(InProgress, Completed));
        assert!(can_transition(InProgress, Pending));
        assert!(!can_transition(Completed, Pending));
        assert!(!can_transition(Completed, InProgress));
        assert!(!can_transition(Pending, Pending));
    }

    #[tokio::test]
    async fn tenant_without_unit_cannot_file() {
        let db = DBService::new_in_memory().await.unwrap();
        let tenant = seed_tenant(&db.pool, "nico@example.com", "cainta").await;
        let err = MaintenanceService::new(db.pool.clone())
            .create_request(&tenant, leak())
            .await
            .unwrap_err();
        assert!(matches!(err, MaintenanceError::NoUnit));
        assert_eq!(err.to_string(), "No Unit");
    }

    #[tokio::test]
    async fn completion_is_stamped_and_terminal() {
        let db = DBService::new_in_memory().await.unwrap();
        let tenant = seed_tenant(&db.pool, "nico@example.com", "cainta").await;
        let unit = seed_unit(&db.pool, "501", "cainta", 800_000).await;
        OccupancyService::new(db.pool.clone())
            .assign_unit(tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
        let service = MaintenanceService::new(db.pool.clone());
        let scope = BranchScope::Branch("cainta".into());

        let request = service.create_request(&tenant, leak()).await.unwrap();
        assert_eq!(request.status, MaintenanceStatus::Pending);
        assert_eq!(request.unit_id, unit.id);

        let started = service
            .update_status(&scope, request.id, MaintenanceStatus::InProgress)
            .await
            .unwrap();
        assert!(started.completed_at.is_none());

        let done = service
            .update_status(&scope, request.id, MaintenanceStatus::Completed)
            .await
            .unwrap();
        assert!(done.completed_at.is_some());

        let err = service
            .update_status(&scope, request.id, MaintenanceStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, MaintenanceError::InvalidTransition { .. }));

        let elsewhere = BranchScope::Branch("cubao".into());
        assert!(matches!(
            service.delete(&elsewhere, request.id).await,
            Err(MaintenanceError::Access(AccessError::OtherBranch))
        ));
        let listed = service.list_for_branch(&scope, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].unit_number, "501");
    }
}
