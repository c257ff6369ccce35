use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::profile::Profile;
use deployment::Deployment;
use serde::Deserialize;
use services::services::auth::{LoginResult, SignupForm, SignupResult};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, middleware::CurrentUser};

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct ResendConfirmationRequest {
    pub email: String,
}

/// POST /api/auth/signup
pub async fn signup(
    State(deployment): State<DeploymentImpl>,
    axum::Json(form): axum::Json<SignupForm>,
) -> Result<ResponseJson<ApiResponse<SignupResult>>, ApiError> {
    let result = deployment.auth().signup(form).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        result,
        "Please check your email to confirm your account",
    )))
}

/// POST /api/auth/login
pub async fn login(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<LoginResult>>, ApiError> {
    let result = deployment
        .auth()
        .login(&payload.email, &payload.password)
        .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

/// POST /api/auth/logout
pub async fn logout(
    State(deployment): State<DeploymentImpl>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.auth().logout(&user.access_token).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/auth/resend-confirmation
pub async fn resend_confirmation(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<ResendConfirmationRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.auth().resend_confirmation(&payload.email).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Confirmation email sent",
    )))
}

/// GET /api/auth/me
pub async fn me(user: CurrentUser) -> ResponseJson<ApiResponse<Profile>> {
    ResponseJson(ApiResponse::success(user.profile))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/signup", post(signup))
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/resend-confirmation", post(resend_confirmation))
            .route("/me", get(me)),
    )
}
