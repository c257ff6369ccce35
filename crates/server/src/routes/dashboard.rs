use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use deployment::Deployment;
use services::services::dashboard::{ManagerDashboard, SuperAdminOverview, TenantDashboard};
use utils::response::ApiResponse;

use super::{BranchQuery, today};
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{StaffUser, SuperAdmin, TenantUser},
};

/// GET /api/dashboard/tenant
pub async fn tenant_dashboard(
    State(deployment): State<DeploymentImpl>,
    user: TenantUser,
) -> Result<ResponseJson<ApiResponse<TenantDashboard>>, ApiError> {
    let dashboard = deployment
        .dashboards()
        .tenant_dashboard(&user.profile, today())
        .await?;
    Ok(ResponseJson(ApiResponse::success(dashboard)))
}

/// GET /api/dashboard/caretaker
/// Managers see their branch; super admins pick one with `?branch=`.
pub async fn caretaker_dashboard(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Query(query): Query<BranchQuery>,
) -> Result<ResponseJson<ApiResponse<ManagerDashboard>>, ApiError> {
    let branch = staff.scope.resolve(query.branch.as_deref())?;
    let dashboard = deployment
        .dashboards()
        .manager_dashboard(&branch, today())
        .await?;
    Ok(ResponseJson(ApiResponse::success(dashboard)))
}

/// GET /api/dashboard/admin
pub async fn admin_overview(
    State(deployment): State<DeploymentImpl>,
    _admin: SuperAdmin,
) -> Result<ResponseJson<ApiResponse<SuperAdminOverview>>, ApiError> {
    let overview = deployment
        .dashboards()
        .super_admin_overview(today())
        .await?;
    Ok(ResponseJson(ApiResponse::success(overview)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/dashboard",
        Router::new()
            .route("/tenant", get(tenant_dashboard))
            .route("/caretaker", get(caretaker_dashboard))
            .route("/admin", get(admin_overview)),
    )
}
