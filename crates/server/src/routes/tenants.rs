use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::NaiveDate;
use db::models::{
    contract::Contract,
    tenant::{Tenant, TenantStatus, TenantWithUnit, UpdateTenant},
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::{ledger::TenantBalance, tenants::NewTenant};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{BranchQuery, today};
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{CurrentUser, StaffUser, authorize_tenant},
};

#[derive(Debug, Deserialize, TS)]
pub struct TenantStatusRequest {
    pub status: TenantStatus,
}

#[derive(Debug, Deserialize, TS)]
pub struct AssignUnitRequest {
    pub unit_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// GET /api/tenants
pub async fn list_tenants(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Query(query): Query<BranchQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<TenantWithUnit>>>, ApiError> {
    let scope = staff.scope.narrow(query.branch.as_deref())?;
    let tenants = deployment.tenants().list(&scope).await?;
    Ok(ResponseJson(ApiResponse::success(tenants)))
}

/// POST /api/tenants
pub async fn create_tenant(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    axum::Json(form): axum::Json<NewTenant>,
) -> Result<ResponseJson<ApiResponse<Tenant>>, ApiError> {
    let tenant = deployment.tenants().create(&staff.scope, form, None).await?;
    Ok(ResponseJson(ApiResponse::success(tenant)))
}

/// GET /api/tenants/{id}
pub async fn get_tenant(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<TenantWithUnit>>, ApiError> {
    let tenant = deployment.tenants().get(&staff.scope, id).await?;
    Ok(ResponseJson(ApiResponse::success(tenant)))
}

/// PUT /api/tenants/{id}
pub async fn update_tenant(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
    axum::Json(data): axum::Json<UpdateTenant>,
) -> Result<ResponseJson<ApiResponse<Tenant>>, ApiError> {
    let tenant = deployment.tenants().update(&staff.scope, id, data).await?;
    Ok(ResponseJson(ApiResponse::success(tenant)))
}

/// DELETE /api/tenants/{id}
pub async fn delete_tenant(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.tenants().delete(&staff.scope, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// PUT /api/tenants/{id}/status
pub async fn set_tenant_status(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<TenantStatusRequest>,
) -> Result<ResponseJson<ApiResponse<Tenant>>, ApiError> {
    let tenant = deployment
        .tenants()
        .set_status(&staff.scope, id, payload.status)
        .await?;
    Ok(ResponseJson(ApiResponse::success(tenant)))
}

/// PUT /api/tenants/{id}/unit
/// Assign or move the tenant to a unit.
pub async fn assign_unit(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<AssignUnitRequest>,
) -> Result<ResponseJson<ApiResponse<Contract>>, ApiError> {
    deployment.tenants().find_scoped(&staff.scope, id).await?;
    deployment.units().get(&staff.scope, payload.unit_id).await?;

    let contract = deployment
        .occupancy()
        .assign_unit(id, payload.unit_id, payload.start_date, payload.end_date)
        .await?;
    Ok(ResponseJson(ApiResponse::success(contract)))
}

/// GET /api/tenants/{id}/balance
pub async fn tenant_balance(
    State(deployment): State<DeploymentImpl>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<TenantBalance>>, ApiError> {
    let tenant = authorize_tenant(&deployment, &user, id).await?;
    let balance = deployment.ledger().tenant_balance(tenant.id, today()).await?;
    Ok(ResponseJson(ApiResponse::success(balance)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/tenants",
        Router::new()
            .route("/", get(list_tenants).post(create_tenant))
            .route(
                "/{id}",
                get(get_tenant).put(update_tenant).delete(delete_tenant),
            )
            .route("/{id}/status", put(set_tenant_status))
            .route("/{id}/unit", put(assign_unit))
            .route("/{id}/balance", get(tenant_balance)),
    )
}
