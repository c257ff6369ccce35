use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::contract::Contract;
use deployment::Deployment;
use services::services::occupancy::{ContractChanges, OccupancyError};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::StaffUser};

/// Load a contract whose tenant lies inside the caller's branches.
async fn scoped_contract(
    deployment: &DeploymentImpl,
    staff: &StaffUser,
    id: Uuid,
) -> Result<Contract, ApiError> {
    let contract = Contract::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or(OccupancyError::ContractNotFound)?;
    deployment
        .tenants()
        .find_scoped(&staff.scope, contract.tenant_id)
        .await?;
    Ok(contract)
}

/// GET /api/contracts/{id}
pub async fn get_contract(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Contract>>, ApiError> {
    let contract = scoped_contract(&deployment, &staff, id).await?;
    Ok(ResponseJson(ApiResponse::success(contract)))
}

/// PUT /api/contracts/{id}
/// Change dates, status or unit; unit occupancy follows the contract.
pub async fn update_contract(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
    axum::Json(changes): axum::Json<ContractChanges>,
) -> Result<ResponseJson<ApiResponse<Contract>>, ApiError> {
    scoped_contract(&deployment, &staff, id).await?;
    if let Some(unit_id) = changes.unit_id {
        deployment.units().get(&staff.scope, unit_id).await?;
    }

    let contract = deployment.occupancy().update_contract(id, changes).await?;
    Ok(ResponseJson(ApiResponse::success(contract)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/contracts/{id}", get(get_contract).put(update_contract))
}
