use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, put},
};
use db::models::maintenance_request::{
    MaintenancePriority, MaintenanceRequest, MaintenanceRequestWithTenant, MaintenanceStatus,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::maintenance::NewMaintenanceRequest;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{StaffUser, TenantUser},
};

#[derive(Debug, Deserialize)]
pub struct MaintenanceQuery {
    pub branch: Option<String>,
    pub status: Option<MaintenanceStatus>,
}

#[derive(Debug, Deserialize, TS)]
pub struct StatusRequest {
    pub status: MaintenanceStatus,
}

#[derive(Debug, Deserialize, TS)]
pub struct PriorityRequest {
    pub priority: MaintenancePriority,
}

/// GET /api/maintenance
pub async fn list_requests(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Query(query): Query<MaintenanceQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<MaintenanceRequestWithTenant>>>, ApiError> {
    let scope = staff.scope.narrow(query.branch.as_deref())?;
    let requests = deployment
        .maintenance()
        .list_for_branch(&scope, query.status)
        .await?;
    Ok(ResponseJson(ApiResponse::success(requests)))
}

/// POST /api/maintenance
pub async fn create_request(
    State(deployment): State<DeploymentImpl>,
    user: TenantUser,
    axum::Json(payload): axum::Json<NewMaintenanceRequest>,
) -> Result<ResponseJson<ApiResponse<MaintenanceRequest>>, ApiError> {
    let request = deployment
        .maintenance()
        .create_request(&user.tenant, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(request)))
}

/// PUT /api/maintenance/{id}/status
pub async fn update_status(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<StatusRequest>,
) -> Result<ResponseJson<ApiResponse<MaintenanceRequest>>, ApiError> {
    let request = deployment
        .maintenance()
        .update_status(&staff.scope, id, payload.status)
        .await?;
    Ok(ResponseJson(ApiResponse::success(request)))
}

/// PUT /api/maintenance/{id}/priority
pub async fn update_priority(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<PriorityRequest>,
) -> Result<ResponseJson<ApiResponse<MaintenanceRequest>>, ApiError> {
    let request = deployment
        .maintenance()
        .update_priority(&staff.scope, id, payload.priority)
        .await?;
    Ok(ResponseJson(ApiResponse::success(request)))
}

/// DELETE /api/maintenance/{id}
pub async fn delete_request(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.maintenance().delete(&staff.scope, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/maintenance",
        Router::new()
            .route("/", get(list_requests).post(create_request))
            .route("/{id}", delete(delete_request))
            .route("/{id}/status", put(update_status))
            .route("/{id}/priority", put(update_priority)),
    )
}
