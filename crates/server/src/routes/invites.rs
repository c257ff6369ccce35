use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use db::models::profile::Profile;
use deployment::Deployment;
use services::services::{
    invites::{NewManager, TenantInvitation},
    tenants::NewTenant,
};
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{StaffUser, SuperAdmin},
};

/// POST /api/invite-tenant
pub async fn invite_tenant(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    axum::Json(form): axum::Json<NewTenant>,
) -> Result<ResponseJson<ApiResponse<TenantInvitation>>, ApiError> {
    let invitation = deployment.invites().invite_tenant(&staff.scope, form).await?;
    tracing::info!(
        tenant_id = %invitation.tenant.id,
        invited_by = %staff.profile.id,
        "Tenant invited"
    );
    Ok(ResponseJson(ApiResponse::success_with_message(
        invitation,
        "Invitation sent",
    )))
}

/// POST /api/invite-apartment-manager
pub async fn invite_apartment_manager(
    State(deployment): State<DeploymentImpl>,
    admin: SuperAdmin,
    axum::Json(form): axum::Json<NewManager>,
) -> Result<ResponseJson<ApiResponse<Profile>>, ApiError> {
    let profile = deployment.invites().invite_apartment_manager(form).await?;
    tracing::info!(
        profile_id = %profile.id,
        invited_by = %admin.profile.id,
        "Apartment manager invited"
    );
    Ok(ResponseJson(ApiResponse::success_with_message(
        profile,
        "Invitation sent",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/invite-tenant", post(invite_tenant))
        .route("/invite-apartment-manager", post(invite_apartment_manager))
}
