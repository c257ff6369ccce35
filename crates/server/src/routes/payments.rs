use std::str::FromStr;

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use chrono::NaiveDate;
use db::models::payment::{Payment, PaymentMode, PaymentStatus, PaymentWithTenant};
use deployment::Deployment;
use serde::Deserialize;
use services::services::{documents::Upload, payments::NewPayment};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{SignedUrl, read_upload};
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{CurrentUser, StaffUser, TenantUser, authorize_tenant},
};

#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub branch: Option<String>,
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Deserialize, TS)]
pub struct RecordPaymentRequest {
    pub tenant_id: Uuid,
    #[serde(flatten)]
    #[ts(flatten)]
    pub payment: NewPayment,
}

/// GET /api/payments
pub async fn list_payments(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Query(query): Query<PaymentQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<PaymentWithTenant>>>, ApiError> {
    let scope = staff.scope.narrow(query.branch.as_deref())?;
    let payments = deployment
        .payments()
        .list_for_branch(&scope, query.status)
        .await?;
    Ok(ResponseJson(ApiResponse::success(payments)))
}

/// POST /api/payments
/// Payment taken by staff; recorded as confirmed.
pub async fn record_payment(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    axum::Json(payload): axum::Json<RecordPaymentRequest>,
) -> Result<ResponseJson<ApiResponse<Payment>>, ApiError> {
    let payment = deployment
        .payments()
        .record_payment(
            &staff.scope,
            payload.tenant_id,
            payload.payment,
            staff.profile.id,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(payment)))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(format!("Missing field: {field}")))
}

/// Multipart payment form: `amount_cents`, `payment_date`, `payment_mode`,
/// optional `notes` and an optional `receipt` file.
async fn read_payment_form(
    mut multipart: Multipart,
) -> Result<(NewPayment, Option<Upload>), ApiError> {
    let mut amount_cents = None;
    let mut payment_date = None;
    let mut payment_mode = None;
    let mut notes = None;
    let mut receipt = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "receipt" => {
                let upload = read_upload(field).await?;
                if !upload.data.is_empty() {
                    receipt = Some(upload);
                }
            }
            "amount_cents" => {
                let text = field.text().await?;
                amount_cents = Some(text.trim().parse::<i64>().map_err(|_| {
                    ApiError::BadRequest("Amount must be a whole number of centavos".into())
                })?);
            }
            "payment_date" => {
                let text = field.text().await?;
                payment_date = Some(
                    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                        .map_err(|_| ApiError::BadRequest("Invalid payment date".into()))?,
                );
            }
            "payment_mode" => {
                let text = field.text().await?;
                payment_mode = Some(
                    PaymentMode::from_str(text.trim())
                        .map_err(|_| ApiError::BadRequest(format!("Unknown payment mode: {text}")))?,
                );
            }
            "notes" => {
                let text = field.text().await?;
                notes = Some(text).filter(|n| !n.trim().is_empty());
            }
            _ => {}
        }
    }

    let payment = NewPayment {
        amount_cents: required(amount_cents, "amount_cents")?,
        payment_date: required(payment_date, "payment_date")?,
        payment_mode: required(payment_mode, "payment_mode")?,
        notes,
    };
    Ok((payment, receipt))
}

/// POST /api/payments/submit
/// Tenant-submitted payment with an optional receipt, pending review.
pub async fn submit_payment(
    State(deployment): State<DeploymentImpl>,
    user: TenantUser,
    multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Payment>>, ApiError> {
    let (payment, receipt) = read_payment_form(multipart).await?;
    let payment = deployment
        .payments()
        .submit_payment(&user.tenant, payment, receipt)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        payment,
        "Payment submitted for review",
    )))
}

/// POST /api/payments/{id}/approve
pub async fn approve_payment(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Payment>>, ApiError> {
    let payment = deployment
        .payments()
        .approve(&staff.scope, id, staff.profile.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(payment)))
}

/// POST /api/payments/{id}/reject
pub async fn reject_payment(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Payment>>, ApiError> {
    let payment = deployment
        .payments()
        .reject(&staff.scope, id, staff.profile.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(payment)))
}

/// DELETE /api/payments/{id}
pub async fn delete_payment(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.payments().delete(&staff.scope, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/payments/{id}/receipt
/// Short-lived link to the uploaded receipt.
pub async fn receipt_url(
    State(deployment): State<DeploymentImpl>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<SignedUrl>>, ApiError> {
    let found = deployment.payments().find(id).await?;
    authorize_tenant(&deployment, &user, found.payment.tenant_id).await?;

    let url = deployment.payments().receipt_url(&found.payment).await?;
    Ok(ResponseJson(ApiResponse::success(SignedUrl { url })))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/payments",
        Router::new()
            .route("/", get(list_payments).post(record_payment))
            .route("/submit", post(submit_payment))
            .route("/{id}", delete(delete_payment))
            .route("/{id}/approve", post(approve_payment))
            .route("/{id}/reject", post(reject_payment))
            .route("/{id}/receipt", get(receipt_url)),
    )
}
