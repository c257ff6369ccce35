use db::models::{
    contract::Contract,
    tenant::{CreateTenant, Tenant, TenantStatus, TenantWithUnit, UpdateTenant},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::validation::{is_valid_contact_number, is_valid_email, non_blank};
use uuid::Uuid;

use super::{
    access::{AccessError, BranchScope},
    occupancy::{OccupancyError, OccupancyService},
};

#[derive(Debug, Error)]
pub enum TenantError {
    #[error("Tenant not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("A tenant with this email already exists")]
    EmailTaken,
    #[error("Tenant still has an active contract")]
    HasActiveContract,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Occupancy(#[from] OccupancyError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Tenant intake form used by staff and by the tenant invitation.
#[derive(Debug, Clone, Deserialize, TS)]
pub struct NewTenant {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub contact_number: String,
    /// Required for super admins; managers default to their own branch
    pub branch: Option<String>,
    pub occupation: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_number: Option<String>,
}

fn optional(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(non_blank).map(str::to_string)
}

impl NewTenant {
    pub fn validate(&self) -> Result<(), TenantError> {
        if non_blank(&self.first_name).is_none() || non_blank(&self.last_name).is_none() {
            return Err(TenantError::Validation("First and last name are required".into()));
        }
        if !is_valid_email(&self.email) {
            return Err(TenantError::Validation("Please enter a valid email address".into()));
        }
        if !is_valid_contact_number(&self.contact_number) {
            return Err(TenantError::Validation("Please enter a valid contact number".into()));
        }
        if let Some(number) = optional(&self.emergency_contact_number)
            && !is_valid_contact_number(&number)
        {
            return Err(TenantError::Validation(
                "Please enter a valid emergency contact number".into(),
            ));
        }
        Ok(())
    }

    pub fn into_create(self, branch: String, profile_id: Option<Uuid>) -> CreateTenant {
        CreateTenant {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            contact_number: self.contact_number.trim().to_string(),
            branch,
            occupation: optional(&self.occupation),
            emergency_contact_name: optional(&self.emergency_contact_name),
            emergency_contact_number: optional(&self.emergency_contact_number),
            profile_id,
        }
    }
}

fn validate_update(data: &UpdateTenant) -> Result<(), TenantError> {
    for name in [&data.first_name, &data.last_name].into_iter().flatten() {
        if non_blank(name).is_none() {
            return Err(TenantError::Validation("Name must not be empty".into()));
        }
    }
    if let Some(email) = &data.email
        && !is_valid_email(email)
    {
        return Err(TenantError::Validation("Please enter a valid email address".into()));
    }
    if let Some(number) = &data.contact_number
        && !is_valid_contact_number(number)
    {
        return Err(TenantError::Validation("Please enter a valid contact number".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct TenantService {
    pool: SqlitePool,
    occupancy: OccupancyService,
}

impl TenantService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            occupancy: OccupancyService::new(pool.clone()),
            pool,
        }
    }

    pub async fn list(&self, scope: &BranchScope) -> Result<Vec<TenantWithUnit>, TenantError> {
        Ok(Tenant::list_with_unit(&self.pool, scope.filter()).await?)
    }

    pub async fn get(&self, scope: &BranchScope, id: Uuid) -> Result<TenantWithUnit, TenantError> {
        let tenant = Tenant::find_with_unit(&self.pool, id)
            .await?
            .ok_or(TenantError::NotFound)?;
        scope.ensure(&tenant.branch)?;
        Ok(tenant)
    }

    /// Fetch a tenant and check it is visible to `scope`.
    pub async fn find_scoped(&self, scope: &BranchScope, id: Uuid) -> Result<Tenant, TenantError> {
        let tenant = Tenant::find_by_id(&self.pool, id)
            .await?
            .ok_or(TenantError::NotFound)?;
        scope.ensure(&tenant.branch)?;
        Ok(tenant)
    }

    pub async fn create(
        &self,
        scope: &BranchScope,
        form: NewTenant,
        profile_id: Option<Uuid>,
    ) -> Result<Tenant, TenantError> {
        form.validate()?;
        let branch = scope.resolve(form.branch.as_deref())?;
        if Tenant::find_by_email(&self.pool, &form.email).await?.is_some() {
            return Err(TenantError::EmailTaken);
        }

        let tenant = Tenant::create(&self.pool, Uuid::new_v4(), &form.into_create(branch, profile_id)).await?;
        info!(tenant_id = %tenant.id, branch = %tenant.branch, "Tenant created");
        Ok(tenant)
    }

    pub async fn update(
        &self,
        scope: &BranchScope,
        id: Uuid,
        mut data: UpdateTenant,
    ) -> Result<Tenant, TenantError> {
        validate_update(&data)?;
        let current = self.find_scoped(scope, id).await?;

        if let Some(email) = data.email.as_mut() {
            *email = email.trim().to_lowercase();
            if let Some(other) = Tenant::find_by_email(&self.pool, email).await?
                && other.id != current.id
            {
                return Err(TenantError::EmailTaken);
            }
        }

        Tenant::update(&self.pool, id, &data)
            .await?
            .ok_or(TenantError::NotFound)
    }

    pub async fn set_status(
        &self,
        scope: &BranchScope,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<Tenant, TenantError> {
        self.find_scoped(scope, id).await?;
        Ok(self.occupancy.set_tenant_status(id, status).await?)
    }

    pub async fn delete(&self, scope: &BranchScope, id: Uuid) -> Result<(), TenantError> {
        self.find_scoped(scope, id).await?;
        if Contract::find_active_by_tenant(&self.pool, id).await?.is_some() {
            return Err(TenantError::HasActiveContract);
        }
        Tenant::delete(&self.pool, id).await?;
        info!(tenant_id = %id, "Tenant deleted");
        Ok(())
    }
}
