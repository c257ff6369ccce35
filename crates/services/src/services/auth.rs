//! Signup, login, logout and access-token verification.

use std::sync::Arc;

use db::models::{
    profile::{CreateProfile, Profile, UserRole},
    tenant::Tenant,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use utils::validation::{is_valid_contact_number, is_valid_email, non_blank};
use uuid::Uuid;

use super::identity::{IdentityError, IdentityProvider};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("No profile found for this account")]
    ProfileMissing,
    #[error("Invalid or expired session")]
    InvalidToken,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Form-level checks; nothing is sent to the identity provider unless
    /// these pass.
    pub fn validate(&self) -> Result<(), AuthError> {
        if non_blank(&self.first_name).is_none() || non_blank(&self.last_name).is_none() {
            return Err(AuthError::Validation("First and last name are required".into()));
        }
        if !is_valid_email(&self.email) {
            return Err(AuthError::Validation("Please enter a valid email address".into()));
        }
        if let Some(number) = self.contact_number.as_deref().and_then(non_blank)
            && !is_valid_contact_number(number)
        {
            return Err(AuthError::Validation("Please enter a valid contact number".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        if self.password != self.confirm_password {
            return Err(AuthError::Validation("Passwords do not match".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SignupResult {
    pub user_id: Uuid,
    pub email: String,
    pub confirmation_required: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct LoginResult {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub profile: Profile,
    /// Dashboard route for the account's role
    pub redirect_to: String,
}

/// Claims carried by the provider's access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: Option<String>,
    pub exp: i64,
    pub aud: String,
    #[serde(default)]
    pub role: Option<String>,
}

pub fn dashboard_path(role: UserRole) -> &'static str {
    match role {
        UserRole::Tenant => "/tenant-dashboard",
        UserRole::ApartmentManager | UserRole::SuperAdmin => "/caretaker-dashboard",
    }
}

/// Verifies HS256 access tokens issued by the identity provider.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub const AUDIENCE: &'static str = "authenticated";

    pub fn new(secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[Self::AUDIENCE]);
        validation.set_required_spec_claims(&["sub", "exp", "aud"]);
        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        jsonwebtoken::decode::<AccessClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!(error = %e, "Rejected access token");
                AuthError::InvalidToken
            })
    }
}

#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    identity: Arc<dyn IdentityProvider>,
    verifier: TokenVerifier,
    site_url: String,
}

impl AuthService {
    pub fn new(
        pool: SqlitePool,
        identity: Arc<dyn IdentityProvider>,
        verifier: TokenVerifier,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            identity,
            verifier,
            site_url: site_url.into(),
        }
    }

    fn confirmation_redirect(&self) -> String {
        format!("{}/email-confirmation", self.site_url)
    }

    pub async fn signup(&self, form: SignupForm) -> Result<SignupResult, AuthError> {
        form.validate()?;

        let email = form.email.trim().to_lowercase();
        let first_name = form.first_name.trim().to_string();
        let last_name = form.last_name.trim().to_string();
        let contact_number = form
            .contact_number
            .as_deref()
            .and_then(non_blank)
            .map(str::to_string);

        let user = self
            .identity
            .sign_up(
                &email,
                &form.password,
                json!({
                    "first_name": first_name,
                    "last_name": last_name,
                    "contact_number": contact_number,
                }),
                &self.confirmation_redirect(),
            )
            .await?;

        // A manager may already have created the tenant record; adopt its branch
        let existing_tenant = Tenant::find_by_email(&self.pool, &email).await?;
        let branch = existing_tenant.as_ref().map(|t| t.branch.clone());

        if Profile::find_by_id(&self.pool, user.id).await?.is_none() {
            Profile::create(
                &self.pool,
                &CreateProfile {
                    id: user.id,
                    email: email.clone(),
                    first_name,
                    last_name,
                    contact_number,
                    role: UserRole::Tenant,
                    branch,
                },
            )
            .await?;
        }

        if let Some(tenant) = existing_tenant.filter(|t| t.profile_id.is_none()) {
            Tenant::set_profile_id(&self.pool, tenant.id, user.id).await?;
        }

        info!(user_id = %user.id, "Account created");

        Ok(SignupResult {
            user_id: user.id,
            email,
            confirmation_required: !user.email_confirmed,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        if !is_valid_email(email) || password.is_empty() {
            return Err(AuthError::Validation("Email and password are required".into()));
        }

        let session = self.identity.sign_in(email.trim(), password).await?;
        let profile = Profile::find_by_id(&self.pool, session.user.id)
            .await?
            .ok_or(AuthError::ProfileMissing)?;

        info!(user_id = %profile.id, role = %profile.role, "User signed in");

        Ok(LoginResult {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
            redirect_to: dashboard_path(profile.role).to_string(),
            profile,
        })
    }

    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        self.identity.sign_out(access_token).await?;
        Ok(())
    }

    pub async fn resend_confirmation(&self, email: &str) -> Result<(), AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::Validation("Please enter a valid email address".into()));
        }
        self.identity
            .resend_confirmation(email.trim(), &self.confirmation_redirect())
            .await?;
        Ok(())
    }

    /// Resolve a bearer token to the caller's profile.
    pub async fn authenticate(&self, token: &str) -> Result<Profile, AuthError> {
        let claims = self.verifier.verify(token)?;
        Profile::find_by_id(&self.pool, claims.sub)
            .await?
            .ok_or(AuthError::ProfileMissing)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use db::DBService;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::Value;

    use super::*;
    use crate::services::identity::{IdentitySession, IdentityUser};

    const SECRET: &str = "test-jwt-secret";

    #[derive(Default)]
    struct FakeIdentity {
        calls: AtomicUsize,
        user_id: Mutex<Option<Uuid>>,
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn sign_up(
            &self,
            email: &str,
            _password: &str,
            _metadata: Value,
            _redirect_to: &str,
        ) -> Result<IdentityUser, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = Uuid::new_v4();
            *self.user_id.lock().unwrap() = Some(id);
            Ok(IdentityUser {
                id,
                email: email.to_string(),
                email_confirmed: false,
            })
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if password != "correct-horse" {
                return Err(IdentityError::InvalidCredentials);
            }
            let id = self.user_id.lock().unwrap().unwrap_or_else(Uuid::new_v4);
            Ok(IdentitySession {
                access_token: "access".into(),
                refresh_token: "refresh".into(),
                expires_in: 3600,
                user: IdentityUser {
                    id,
                    email: email.to_string(),
                    email_confirmed: true,
                },
            })
        }

        async fn sign_out(&self, _access_token: &str) -> Result<(), IdentityError> {
            Ok(())
        }

        async fn resend_confirmation(&self, _email: &str, _redirect_to: &str) -> Result<(), IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn invite(
            &self,
            _email: &str,
            _metadata: Value,
            _redirect_to: &str,
        ) -> Result<IdentityUser, IdentityError> {
            unreachable!("not used by auth tests")
        }
    }

    fn form(password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            first_name: "Ana".into(),
            last_name: "Reyes".into(),
            email: "Ana.Reyes@example.com".into(),
            contact_number: Some("0917 123 4567".into()),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    async fn service() -> (AuthService, Arc<FakeIdentity>) {
        let db = DBService::new_in_memory().await.unwrap();
        let identity = Arc::new(FakeIdentity::default());
        let service = AuthService::new(
            db.pool,
            identity.clone(),
            TokenVerifier::new(&SecretString::from(SECRET.to_string())),
            "http://localhost:5173",
        );
        (service, identity)
    }

    #[tokio::test]
    async fn mismatched_passwords_never_reach_the_provider() {
        let (service, identity) = service().await;
        let err = service
            .signup(form("correct-horse", "correct-horsf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(ref m) if m == "Passwords do not match"));
        assert_eq!(identity.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn short_password_and_bad_email_fail_validation() {
        assert!(form("short", "short").validate().is_err());
        let mut bad_email = form("correct-horse", "correct-horse");
        bad_email.email = "not-an-email".into();
        assert!(bad_email.validate().is_err());
        assert!(form("correct-horse", "correct-horse").validate().is_ok());
    }

    #[tokio::test]
    async fn signup_then_login_redirects_tenant() {
        let (service, _identity) = service().await;
        let result = service
            .signup(form("correct-horse", "correct-horse"))
            .await
            .unwrap();
        assert!(result.confirmation_required);
        assert_eq!(result.email, "ana.reyes@example.com");

        let login = service
            .login("ana.reyes@example.com", "correct-horse")
            .await
            .unwrap();
        assert_eq!(login.profile.role, UserRole::Tenant);
        assert_eq!(login.redirect_to, "/tenant-dashboard");

        let err = service.login("ana.reyes@example.com", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, AuthError::Identity(IdentityError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn login_without_profile_is_rejected() {
        let (service, _identity) = service().await;
        let err = service.login("ghost@example.com", "correct-horse").await.unwrap_err();
        assert!(matches!(err, AuthError::ProfileMissing));
    }

    #[tokio::test]
    async fn authenticate_checks_signature_and_audience() {
        let (service, _identity) = service().await;
        let result = service
            .signup(form("correct-horse", "correct-horse"))
            .await
            .unwrap();

        let claims = AccessClaims {
            sub: result.user_id,
            email: Some(result.email.clone()),
            exp: chrono::Utc::now().timestamp() + 600,
            aud: TokenVerifier::AUDIENCE.to_string(),
            role: Some("authenticated".into()),
        };
        let good = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let profile = service.authenticate(&good).await.unwrap();
        assert_eq!(profile.id, result.user_id);

        let forged = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"another-secret"),
        )
        .unwrap();
        assert!(matches!(
            service.authenticate(&forged).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn staff_roles_land_on_caretaker_dashboard() {
        assert_eq!(dashboard_path(UserRole::ApartmentManager), "/caretaker-dashboard");
        assert_eq!(dashboard_path(UserRole::SuperAdmin), "/caretaker-dashboard");
    }
}
