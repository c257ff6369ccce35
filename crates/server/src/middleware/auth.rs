//! Request extractors that authenticate the bearer token and gate by role.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use db::models::{
    profile::{Profile, UserRole},
    tenant::Tenant,
};
use deployment::Deployment;
use services::services::access::{AccessError, BranchScope};
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

/// Any signed-in account with a profile.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub profile: Profile,
    pub access_token: String,
}

impl FromRequestParts<DeploymentImpl> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, deployment)
                .await
                .map_err(|_| ApiError::Unauthorized)?;

        let profile = deployment.auth().authenticate(bearer.token()).await?;
        Ok(Self {
            profile,
            access_token: bearer.token().to_string(),
        })
    }
}

/// Apartment manager or super admin, with the branches they may touch.
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub profile: Profile,
    pub scope: BranchScope,
}

impl FromRequestParts<DeploymentImpl> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { profile, .. } = CurrentUser::from_request_parts(parts, deployment).await?;
        let scope = BranchScope::for_profile(&profile)?;
        Ok(Self { profile, scope })
    }
}

#[derive(Debug, Clone)]
pub struct SuperAdmin {
    pub profile: Profile,
}

impl FromRequestParts<DeploymentImpl> for SuperAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { profile, .. } = CurrentUser::from_request_parts(parts, deployment).await?;
        if profile.role != UserRole::SuperAdmin {
            return Err(AccessError::Forbidden.into());
        }
        Ok(Self { profile })
    }
}

/// Signed-in tenant together with their tenant record.
#[derive(Debug, Clone)]
pub struct TenantUser {
    pub profile: Profile,
    pub tenant: Tenant,
}

impl FromRequestParts<DeploymentImpl> for TenantUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { profile, .. } = CurrentUser::from_request_parts(parts, deployment).await?;
        if profile.role != UserRole::Tenant {
            return Err(AccessError::Forbidden.into());
        }
        let tenant = deployment.dashboards().tenant_for_profile(&profile).await?;
        Ok(Self { profile, tenant })
    }
}

/// Staff may reach tenants of their branch; a tenant only reaches their own
/// record.
pub async fn authorize_tenant(
    deployment: &DeploymentImpl,
    user: &CurrentUser,
    tenant_id: Uuid,
) -> Result<Tenant, ApiError> {
    if user.profile.role.is_staff() {
        let scope = BranchScope::for_profile(&user.profile)?;
        return Ok(deployment.tenants().find_scoped(&scope, tenant_id).await?);
    }

    let own = deployment.dashboards().tenant_for_profile(&user.profile).await?;
    if own.id != tenant_id {
        return Err(AccessError::Forbidden.into());
    }
    Ok(own)
}
