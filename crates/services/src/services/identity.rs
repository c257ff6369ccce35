//! Hosted identity provider (GoTrue) consumed over HTTP.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use super::baas::{BaasAuth, BaasClient, BaasError};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("Email not confirmed")]
    EmailNotConfirmed,
    #[error("User already registered")]
    AlreadyRegistered,
    #[error("{0}")]
    Rejected(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(BaasError),
}

impl From<BaasError> for IdentityError {
    fn from(err: BaasError) -> Self {
        let message = err.provider_message().unwrap_or_default();
        let lowered = message.to_lowercase();
        match err.status() {
            Some(400) if lowered.contains("invalid login credentials") => {
                IdentityError::InvalidCredentials
            }
            Some(400 | 401) if lowered.contains("email not confirmed") => {
                IdentityError::EmailNotConfirmed
            }
            Some(400 | 422) if lowered.contains("already registered") => {
                IdentityError::AlreadyRegistered
            }
            Some(status) if (400..500).contains(&status) && !message.is_empty() => {
                IdentityError::Rejected(message)
            }
            _ => IdentityError::Unavailable(err),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: String,
    pub email_confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: IdentityUser,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register an account; the provider sends the confirmation e-mail.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
        redirect_to: &str,
    ) -> Result<IdentityUser, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;

    async fn resend_confirmation(&self, email: &str, redirect_to: &str) -> Result<(), IdentityError>;

    /// Create an account on behalf of someone and e-mail them an invitation.
    async fn invite(
        &self,
        email: &str,
        metadata: Value,
        redirect_to: &str,
    ) -> Result<IdentityUser, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: Uuid,
    email: Option<String>,
    email_confirmed_at: Option<String>,
}

impl From<GoTrueUser> for IdentityUser {
    fn from(user: GoTrueUser) -> Self {
        Self {
            id: user.id,
            email: user.email.unwrap_or_default(),
            email_confirmed: user.email_confirmed_at.is_some(),
        }
    }
}

/// Sign-up returns a bare user while confirmation is pending, or a
/// session when auto-confirm is on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session { user: GoTrueUser },
    User(GoTrueUser),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: GoTrueUser,
}

#[derive(Clone)]
pub struct GoTrueIdentity {
    client: BaasClient,
}

impl GoTrueIdentity {
    pub fn new(client: BaasClient) -> Self {
        Self { client }
    }
}

fn redirect_query(redirect_to: &str) -> String {
    format!("redirect_to={}", urlencoding::encode(redirect_to))
}

#[async_trait]
impl IdentityProvider for GoTrueIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
        redirect_to: &str,
    ) -> Result<IdentityUser, IdentityError> {
        let body = json!({ "email": email, "password": password, "data": metadata });
        let res: SignUpResponse = self
            .client
            .json(
                Method::POST,
                &format!("/auth/v1/signup?{}", redirect_query(redirect_to)),
                BaasAuth::Anon,
                Some(&body),
            )
            .await?;
        let user = match res {
            SignUpResponse::Session { user } | SignUpResponse::User(user) => user,
        };
        Ok(user.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError> {
        let body = json!({ "email": email, "password": password });
        let res: TokenResponse = self
            .client
            .json(
                Method::POST,
                "/auth/v1/token?grant_type=password",
                BaasAuth::Anon,
                Some(&body),
            )
            .await?;
        Ok(IdentitySession {
            access_token: res.access_token,
            refresh_token: res.refresh_token,
            expires_in: res.expires_in,
            user: res.user.into(),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        self.client
            .send::<Value>(Method::POST, "/auth/v1/logout", BaasAuth::User(access_token), None)
            .await?;
        Ok(())
    }

    async fn resend_confirmation(&self, email: &str, redirect_to: &str) -> Result<(), IdentityError> {
        let body = json!({
            "type": "signup",
            "email": email,
            "options": { "email_redirect_to": redirect_to },
        });
        self.client
            .send(Method::POST, "/auth/v1/resend", BaasAuth::Anon, Some(&body))
            .await?;
        Ok(())
    }

    async fn invite(
        &self,
        email: &str,
        metadata: Value,
        redirect_to: &str,
    ) -> Result<IdentityUser, IdentityError> {
        let body = json!({ "email": email, "data": metadata });
        let user: GoTrueUser = self
            .client
            .json(
                Method::POST,
                &format!("/auth/v1/invite?{}", redirect_query(redirect_to)),
                BaasAuth::ServiceRole,
                Some(&body),
            )
            .await?;
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, body: &str) -> BaasError {
        BaasError::Http {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn maps_known_provider_errors() {
        assert!(matches!(
            IdentityError::from(http(400, r#"{"msg":"Invalid login credentials"}"#)),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(
            IdentityError::from(http(400, r#"{"error_description":"Email not confirmed"}"#)),
            IdentityError::EmailNotConfirmed
        ));
        assert!(matches!(
            IdentityError::from(http(422, r#"{"msg":"User already registered"}"#)),
            IdentityError::AlreadyRegistered
        ));
        assert!(matches!(
            IdentityError::from(http(422, r#"{"msg":"Password should be at least 6 characters"}"#)),
            IdentityError::Rejected(_)
        ));
        assert!(matches!(
            IdentityError::from(http(502, "bad gateway")),
            IdentityError::Unavailable(_)
        ));
    }

    #[test]
    fn sign_up_response_accepts_both_shapes() {
        let bare = r#"{"id":"6f1d3c2e-8a1b-4a7e-9d55-0c1e2f3a4b5c","email":"a@b.co","email_confirmed_at":null}"#;
        let wrapped = r#"{"user":{"id":"6f1d3c2e-8a1b-4a7e-9d55-0c1e2f3a4b5c","email":"a@b.co","email_confirmed_at":"2025-01-01T00:00:00Z"},"session":{}}"#;

        let user = match serde_json::from_str::<SignUpResponse>(bare).unwrap() {
            SignUpResponse::Session { user } | SignUpResponse::User(user) => IdentityUser::from(user),
        };
        assert!(!user.email_confirmed);

        let user = match serde_json::from_str::<SignUpResponse>(wrapped).unwrap() {
            SignUpResponse::Session { user } | SignUpResponse::User(user) => IdentityUser::from(user),
        };
        assert!(user.email_confirmed);
        assert_eq!(user.email, "a@b.co");
    }
}
