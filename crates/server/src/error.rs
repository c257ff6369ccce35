use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::{
    access::AccessError,
    auth::AuthError,
    dashboard::DashboardError,
    database_validator::DatabaseValidationError,
    documents::DocumentError,
    identity::IdentityError,
    invites::InviteError,
    ledger::LedgerError,
    maintenance::MaintenanceError,
    notifications::NotificationError,
    occupancy::OccupancyError,
    payments::PaymentError,
    storage::StorageError,
    tenants::TenantError,
    units::UnitError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Invite(#[from] InviteError),
    #[error(transparent)]
    Tenant(#[from] TenantError),
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error(transparent)]
    Occupancy(#[from] OccupancyError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error(transparent)]
    DatabaseValidation(#[from] DatabaseValidationError),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

fn access_status(err: &AccessError) -> StatusCode {
    match err {
        AccessError::BranchRequired => StatusCode::BAD_REQUEST,
        AccessError::Forbidden | AccessError::OtherBranch | AccessError::MissingBranch => {
            StatusCode::FORBIDDEN
        }
    }
}

fn identity_status(err: &IdentityError) -> StatusCode {
    match err {
        IdentityError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        IdentityError::EmailNotConfirmed => StatusCode::FORBIDDEN,
        IdentityError::AlreadyRegistered => StatusCode::CONFLICT,
        IdentityError::Rejected(_) => StatusCode::BAD_REQUEST,
        IdentityError::Unavailable(_) => StatusCode::BAD_GATEWAY,
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::Unavailable(_) => StatusCode::BAD_GATEWAY,
    }
}

fn document_status(err: &DocumentError) -> StatusCode {
    match err {
        DocumentError::NotFound => StatusCode::NOT_FOUND,
        DocumentError::UnsupportedType(_) | DocumentError::Empty => StatusCode::BAD_REQUEST,
        DocumentError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        DocumentError::Storage(e) => storage_status(e),
        DocumentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn occupancy_status(err: &OccupancyError) -> StatusCode {
    match err {
        OccupancyError::TenantNotFound
        | OccupancyError::UnitNotFound
        | OccupancyError::ContractNotFound => StatusCode::NOT_FOUND,
        OccupancyError::UnitUnderMaintenance
        | OccupancyError::UnitOccupied
        | OccupancyError::TenantHasContract
        | OccupancyError::TenantInactive => StatusCode::CONFLICT,
        OccupancyError::BranchMismatch | OccupancyError::InvalidDates => StatusCode::BAD_REQUEST,
        OccupancyError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn tenant_status(err: &TenantError) -> StatusCode {
    match err {
        TenantError::NotFound => StatusCode::NOT_FOUND,
        TenantError::Validation(_) => StatusCode::BAD_REQUEST,
        TenantError::EmailTaken | TenantError::HasActiveContract => StatusCode::CONFLICT,
        TenantError::Access(e) => access_status(e),
        TenantError::Occupancy(e) => occupancy_status(e),
        TenantError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::TenantNotFound | LedgerError::NoContract | LedgerError::UnitNotFound => {
            StatusCode::NOT_FOUND
        }
        LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            // 413 when the body limit cut the stream, 400 for malformed forms
            ApiError::Multipart(e) => e.status(),
            ApiError::Access(e) => access_status(e),
            ApiError::Auth(e) => match e {
                AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::Identity(e) => identity_status(e),
                AuthError::ProfileMissing => StatusCode::FORBIDDEN,
                AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Identity(e) => identity_status(e),
            ApiError::Invite(e) => match e {
                InviteError::Validation(_) => StatusCode::BAD_REQUEST,
                InviteError::AccountExists => StatusCode::CONFLICT,
                InviteError::Tenant(e) => tenant_status(e),
                InviteError::Identity(e) => identity_status(e),
                InviteError::Access(e) => access_status(e),
                InviteError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Tenant(e) => tenant_status(e),
            ApiError::Unit(e) => match e {
                UnitError::NotFound => StatusCode::NOT_FOUND,
                UnitError::Validation(_) | UnitError::OccupiedIsDerived => StatusCode::BAD_REQUEST,
                UnitError::DuplicateNumber | UnitError::HasActiveContract | UnitError::InUse => {
                    StatusCode::CONFLICT
                }
                UnitError::Access(e) => access_status(e),
                UnitError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Occupancy(e) => occupancy_status(e),
            ApiError::Ledger(e) => ledger_status(e),
            ApiError::Payment(e) => match e {
                PaymentError::NotFound
                | PaymentError::TenantNotFound
                | PaymentError::NoContract
                | PaymentError::NoReceipt => StatusCode::NOT_FOUND,
                PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
                PaymentError::InvalidTransition { .. } => StatusCode::CONFLICT,
                PaymentError::Receipt(e) => document_status(e),
                PaymentError::Storage(e) => storage_status(e),
                PaymentError::Access(e) => access_status(e),
                PaymentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Maintenance(e) => match e {
                MaintenanceError::NotFound | MaintenanceError::NoUnit => StatusCode::NOT_FOUND,
                MaintenanceError::Validation(_) => StatusCode::BAD_REQUEST,
                MaintenanceError::InvalidTransition { .. } => StatusCode::CONFLICT,
                MaintenanceError::Access(e) => access_status(e),
                MaintenanceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Notification(e) => match e {
                NotificationError::NotFound | NotificationError::TemplateNotFound => {
                    StatusCode::NOT_FOUND
                }
                NotificationError::Validation(_) => StatusCode::BAD_REQUEST,
                NotificationError::Access(e) => access_status(e),
                NotificationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Document(e) => document_status(e),
            ApiError::Dashboard(e) => match e {
                DashboardError::TenantRecordMissing => StatusCode::NOT_FOUND,
                DashboardError::Ledger(e) => ledger_status(e),
                DashboardError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::DatabaseValidation(_) | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Backend details stay in the logs
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            StatusCode::BAD_GATEWAY => {
                tracing::warn!(error = %self, "Upstream provider failed");
                "Upstream service unavailable, please try again".to_string()
            }
            _ => {
                tracing::debug!(status = %status, error = %self, "Request rejected");
                self.to_string()
            }
        };

        (status, ResponseJson(ApiResponse::<()>::error(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use db::models::{maintenance_request::MaintenanceStatus, payment::PaymentStatus};

    use super::*;

    #[test]
    fn domain_messages_are_preserved_for_not_found() {
        let err = ApiError::from(LedgerError::NoContract);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "No Contract");

        let err = ApiError::from(MaintenanceError::NoUnit);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "No Unit");
    }

    #[test]
    fn conflicts_map_to_409() {
        assert_eq!(
            ApiError::from(OccupancyError::UnitOccupied).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(PaymentError::InvalidTransition {
                from: PaymentStatus::Confirmed
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(MaintenanceError::InvalidTransition {
                from: MaintenanceStatus::Completed,
                to: MaintenanceStatus::Pending,
            })
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn nested_access_errors_are_forbidden() {
        let err = ApiError::from(TenantError::Access(AccessError::OtherBranch));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        let err = ApiError::from(AuthError::ProfileMissing);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn auth_failures_are_unauthorized() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(AuthError::InvalidToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(IdentityError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn database_errors_hide_details() {
        let res = ApiError::from(sqlx::Error::RowNotFound).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
