use std::str::FromStr;

use axum::{
    Router,
    extract::{Multipart, Path, State},
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::document::{Document, DocumentType};
use deployment::Deployment;
use services::services::documents::Upload;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{SignedUrl, read_upload};
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{CurrentUser, authorize_tenant},
};

/// GET /api/tenants/{id}/documents
pub async fn list_documents(
    State(deployment): State<DeploymentImpl>,
    user: CurrentUser,
    Path(tenant_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Document>>>, ApiError> {
    let tenant = authorize_tenant(&deployment, &user, tenant_id).await?;
    let documents = deployment.documents().list(tenant.id).await?;
    Ok(ResponseJson(ApiResponse::success(documents)))
}

/// POST /api/tenants/{id}/documents
/// Multipart form with a `document_type` field and a `file`.
pub async fn upload_document(
    State(deployment): State<DeploymentImpl>,
    user: CurrentUser,
    Path(tenant_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Document>>, ApiError> {
    let tenant = authorize_tenant(&deployment, &user, tenant_id).await?;

    let mut document_type = DocumentType::Other;
    let mut upload: Option<Upload> = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => upload = Some(read_upload(field).await?),
            "document_type" => {
                let text = field.text().await?;
                document_type = DocumentType::from_str(text.trim()).map_err(|_| {
                    ApiError::BadRequest(format!("Unknown document type: {text}"))
                })?;
            }
            _ => {}
        }
    }
    let upload = upload.ok_or_else(|| ApiError::BadRequest("Missing field: file".into()))?;

    let document = deployment
        .documents()
        .upload(&tenant, document_type, upload, Some(user.profile.id))
        .await?;
    Ok(ResponseJson(ApiResponse::success(document)))
}

async fn authorized_document(
    deployment: &DeploymentImpl,
    user: &CurrentUser,
    id: Uuid,
) -> Result<Document, ApiError> {
    let document = deployment.documents().find(id).await?;
    authorize_tenant(deployment, user, document.tenant_id).await?;
    Ok(document)
}

/// GET /api/documents/{id}/url
pub async fn document_url(
    State(deployment): State<DeploymentImpl>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<SignedUrl>>, ApiError> {
    let document = authorized_document(&deployment, &user, id).await?;
    let url = deployment.documents().signed_url(&document).await?;
    Ok(ResponseJson(ApiResponse::success(SignedUrl { url })))
}

/// DELETE /api/documents/{id}
pub async fn delete_document(
    State(deployment): State<DeploymentImpl>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let document = authorized_document(&deployment, &user, id).await?;
    deployment.documents().delete(&document).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/tenants/{id}/documents",
            get(list_documents).post(upload_document),
        )
        .route("/documents/{id}/url", get(document_url))
        .route("/documents/{id}", delete(delete_document))
}
