use axum::{Router, extract::multipart::Field};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use services::services::documents::Upload;
use ts_rs::TS;

use crate::{DeploymentImpl, error::ApiError};

pub mod auth;
pub mod contracts;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod invites;
pub mod maintenance;
pub mod notifications;
pub mod payments;
pub mod reports;
pub mod tenants;
pub mod units;

/// Optional `?branch=` filter accepted by staff listings.
#[derive(Debug, Default, Deserialize)]
pub struct BranchQuery {
    pub branch: Option<String>,
}

/// Short-lived download link for a stored object.
#[derive(Debug, Serialize, TS)]
pub struct SignedUrl {
    pub url: String,
}

/// Calendar date used for due dates and report names.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) async fn read_upload(field: Field<'_>) -> Result<Upload, ApiError> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field.bytes().await?;
    Ok(Upload {
        file_name,
        content_type,
        data,
    })
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .merge(health::router(deployment))
        .merge(auth::router(deployment))
        .merge(invites::router(deployment))
        .merge(tenants::router(deployment))
        .merge(units::router(deployment))
        .merge(contracts::router(deployment))
        .merge(payments::router(deployment))
        .merge(maintenance::router(deployment))
        .merge(notifications::router(deployment))
        .merge(documents::router(deployment))
        .merge(reports::router(deployment))
        .merge(dashboard::router(deployment))
}
