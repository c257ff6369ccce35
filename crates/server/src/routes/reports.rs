use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use db::models::payment::PaymentStatus;
use deployment::Deployment;
use serde::Deserialize;
use services::services::reports::{payments_csv, report_file_name, tenants_csv};

use super::{BranchQuery, today};
use crate::{DeploymentImpl, error::ApiError, middleware::StaffUser};

#[derive(Debug, Deserialize)]
pub struct PaymentReportQuery {
    pub branch: Option<String>,
    pub status: Option<PaymentStatus>,
}

fn csv_attachment(kind: &str, body: String) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        report_file_name(kind, today())
    );
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// GET /api/reports/tenants.csv
pub async fn tenants_report(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Query(query): Query<BranchQuery>,
) -> Result<Response, ApiError> {
    let scope = staff.scope.narrow(query.branch.as_deref())?;
    let rows = deployment.tenants().list(&scope).await?;
    tracing::info!(rows = rows.len(), "Tenant report exported");
    Ok(csv_attachment("tenants", tenants_csv(&rows)))
}

/// GET /api/reports/payments.csv
pub async fn payments_report(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Query(query): Query<PaymentReportQuery>,
) -> Result<Response, ApiError> {
    let scope = staff.scope.narrow(query.branch.as_deref())?;
    let rows = deployment
        .payments()
        .list_for_branch(&scope, query.status)
        .await?;
    tracing::info!(rows = rows.len(), "Payment report exported");
    Ok(csv_attachment("payments", payments_csv(&rows)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/reports/tenants.csv", get(tenants_report))
        .route("/reports/payments.csv", get(payments_report))
}
