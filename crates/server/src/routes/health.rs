use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::get,
};
use deployment::Deployment;
use services::services::database_validator::HealthReport;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

/// GET /api/health
/// 503 with the report attached when the schema is incomplete.
pub async fn health_check(State(deployment): State<DeploymentImpl>) -> Result<Response, ApiError> {
    let report = deployment.database_validator().check().await?;

    if report.is_healthy() {
        return Ok(ResponseJson(ApiResponse::<HealthReport>::success(report)).into_response());
    }

    tracing::warn!(summary = %report.summary(), "Health check failed");
    Ok((
        StatusCode::SERVICE_UNAVAILABLE,
        ResponseJson(ApiResponse::<HealthReport>::error_with_data(report)),
    )
        .into_response())
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/health", get(health_check))
}
