use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::unit::{Unit, UnitStatus, UpdateUnit};
use deployment::Deployment;
use serde::Deserialize;
use services::services::units::NewUnit;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::StaffUser};

#[derive(Debug, Deserialize)]
pub struct UnitQuery {
    pub branch: Option<String>,
    pub status: Option<UnitStatus>,
}

/// GET /api/units
pub async fn list_units(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Query(query): Query<UnitQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Unit>>>, ApiError> {
    let scope = staff.scope.narrow(query.branch.as_deref())?;
    let units = deployment.units().list(&scope, query.status).await?;
    Ok(ResponseJson(ApiResponse::success(units)))
}

/// POST /api/units
pub async fn create_unit(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    axum::Json(form): axum::Json<NewUnit>,
) -> Result<ResponseJson<ApiResponse<Unit>>, ApiError> {
    let unit = deployment.units().create(&staff.scope, form).await?;
    Ok(ResponseJson(ApiResponse::success(unit)))
}

/// GET /api/units/{id}
pub async fn get_unit(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Unit>>, ApiError> {
    let unit = deployment.units().get(&staff.scope, id).await?;
    Ok(ResponseJson(ApiResponse::success(unit)))
}

/// PUT /api/units/{id}
pub async fn update_unit(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
    axum::Json(data): axum::Json<UpdateUnit>,
) -> Result<ResponseJson<ApiResponse<Unit>>, ApiError> {
    let unit = deployment.units().update(&staff.scope, id, data).await?;
    Ok(ResponseJson(ApiResponse::success(unit)))
}

/// DELETE /api/units/{id}
pub async fn delete_unit(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.units().delete(&staff.scope, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/units",
        Router::new()
            .route("/", get(list_units).post(create_unit))
            .route("/{id}", get(get_unit).put(update_unit).delete(delete_unit)),
    )
}
