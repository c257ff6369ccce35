use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    notification::Notification,
    notification_template::{
        CreateNotificationTemplate, NotificationTemplate, UpdateNotificationTemplate,
    },
};
use deployment::Deployment;
use services::services::notifications::{DispatchSummary, SendNotification};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{BranchQuery, today};
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{StaffUser, TenantUser},
};

/// GET /api/notification-templates
/// Templates of the branch plus the ones shared by every branch.
pub async fn list_templates(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Query(query): Query<BranchQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<NotificationTemplate>>>, ApiError> {
    let scope = staff.scope.narrow(query.branch.as_deref())?;
    let templates = deployment.notifications().list_templates(&scope).await?;
    Ok(ResponseJson(ApiResponse::success(templates)))
}

/// POST /api/notification-templates
pub async fn create_template(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    axum::Json(data): axum::Json<CreateNotificationTemplate>,
) -> Result<ResponseJson<ApiResponse<NotificationTemplate>>, ApiError> {
    let template = deployment
        .notifications()
        .create_template(&staff.scope, data)
        .await?;
    Ok(ResponseJson(ApiResponse::success(template)))
}

/// PUT /api/notification-templates/{id}
pub async fn update_template(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
    axum::Json(data): axum::Json<UpdateNotificationTemplate>,
) -> Result<ResponseJson<ApiResponse<NotificationTemplate>>, ApiError> {
    let template = deployment
        .notifications()
        .update_template(&staff.scope, id, data)
        .await?;
    Ok(ResponseJson(ApiResponse::success(template)))
}

/// DELETE /api/notification-templates/{id}
pub async fn delete_template(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .notifications()
        .delete_template(&staff.scope, id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/notifications/send
pub async fn send_notification(
    State(deployment): State<DeploymentImpl>,
    staff: StaffUser,
    axum::Json(request): axum::Json<SendNotification>,
) -> Result<ResponseJson<ApiResponse<DispatchSummary>>, ApiError> {
    let summary = deployment
        .notifications()
        .send(&staff.scope, staff.profile.id, request, today())
        .await?;

    let message = format!(
        "Notification sent to {} recipient(s)",
        summary.notifications_created
    );
    Ok(ResponseJson(ApiResponse::success_with_message(summary, message)))
}

/// GET /api/notifications/mine
pub async fn my_notifications(
    State(deployment): State<DeploymentImpl>,
    user: TenantUser,
) -> Result<ResponseJson<ApiResponse<Vec<Notification>>>, ApiError> {
    let notifications = deployment
        .notifications()
        .list_for_tenant(user.tenant.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(notifications)))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(deployment): State<DeploymentImpl>,
    user: TenantUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Notification>>, ApiError> {
    let notification = deployment
        .notifications()
        .mark_read(user.tenant.id, id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(notification)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let templates = Router::new()
        .route("/", get(list_templates).post(create_template))
        .route("/{id}", put(update_template).delete(delete_template));

    let notifications = Router::new()
        .route("/send", post(send_notification))
        .route("/mine", get(my_notifications))
        .route("/{id}/read", post(mark_read));

    Router::new()
        .nest("/notification-templates", templates)
        .nest("/notifications", notifications)
}
