//! Staff-initiated account invitations.

use std::sync::Arc;

use db::models::{
    profile::{CreateProfile, Profile, UserRole},
    tenant::{CreateTenant, Tenant},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::validation::{is_valid_contact_number, is_valid_email, non_blank};
use uuid::Uuid;

use super::{
    access::{AccessError, BranchScope},
    identity::{IdentityError, IdentityProvider},
    tenants::{NewTenant, TenantError},
};

#[derive(Debug, Error)]
pub enum InviteError {
    #[error("{0}")]
    Validation(String),
    #[error("An account with this email already exists")]
    AccountExists,
    #[error(transparent)]
    Tenant(#[from] TenantError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct NewManager {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub contact_number: String,
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct TenantInvitation {
    pub tenant: Tenant,
    pub profile: Profile,
}

#[derive(Clone)]
pub struct InviteService {
    pool: SqlitePool,
    identity: Arc<dyn IdentityProvider>,
    site_url: String,
}

impl InviteService {
    pub fn new(pool: SqlitePool, identity: Arc<dyn IdentityProvider>, site_url: impl Into<String>) -> Self {
        Self {
            pool,
            identity,
            site_url: site_url.into(),
        }
    }

    fn redirect(&self) -> String {
        format!("{}/email-confirmation", self.site_url)
    }

    async fn ensure_no_account(&self, email: &str) -> Result<(), InviteError> {
        if Profile::find_by_email(&self.pool, email).await?.is_some() {
            return Err(InviteError::AccountExists);
        }
        Ok(())
    }

    /// Creates the tenant record, sends the invitation and links the new
    /// account's profile to the record.
    pub async fn invite_tenant(
        &self,
        scope: &BranchScope,
        form: NewTenant,
    ) -> Result<TenantInvitation, InviteError> {
        form.validate()?;
        let branch = scope.resolve(form.branch.as_deref())?;
        let data = form.into_create(branch, None);

        self.ensure_no_account(&data.email).await?;
        if Tenant::find_by_email(&self.pool, &data.email).await?.is_some() {
            return Err(TenantError::EmailTaken.into());
        }

        let user = self
            .identity
            .invite(
                &data.email,
                json!({
                    "first_name": data.first_name,
                    "last_name": data.last_name,
                    "role": UserRole::Tenant.to_string(),
                }),
                &self.redirect(),
            )
            .await?;

        // Profile and tenant row land together or not at all
        let mut tx = self.pool.begin().await?;
        let profile = Profile::create(
            &mut *tx,
            &CreateProfile {
                id: user.id,
                email: data.email.clone(),
                first_name: data.first_name.clone(),
                last_name: data.last_name.clone(),
                contact_number: Some(data.contact_number.clone()),
                role: UserRole::Tenant,
                branch: Some(data.branch.clone()),
            },
        )
        .await?;
        let tenant = Tenant::create(
            &mut *tx,
            Uuid::new_v4(),
            &CreateTenant {
                profile_id: Some(profile.id),
                ..data
            },
        )
        .await?;
        tx.commit().await?;

        info!(tenant_id = %tenant.id, user_id = %user.id, branch = %tenant.branch, "Tenant invited");
        Ok(TenantInvitation { tenant, profile })
    }

    pub async fn invite_apartment_manager(&self, form: NewManager) -> Result<Profile, InviteError> {
        let first_name = non_blank(&form.first_name);
        let last_name = non_blank(&form.last_name);
        let (Some(first_name), Some(last_name)) = (first_name, last_name) else {
            return Err(InviteError::Validation("First and last name are required".into()));
        };
        if !is_valid_email(&form.email) {
            return Err(InviteError::Validation("Please enter a valid email address".into()));
        }
        if !is_valid_contact_number(&form.contact_number) {
            return Err(InviteError::Validation("Please enter a valid contact number".into()));
        }
        let branch = non_blank(&form.branch)
            .ok_or_else(|| InviteError::Validation("A branch must be assigned".into()))?;
        let email = form.email.trim().to_lowercase();

        self.ensure_no_account(&email).await?;

        let user = self
            .identity
            .invite(
                &email,
                json!({
                    "first_name": first_name,
                    "last_name": last_name,
                    "role": UserRole::ApartmentManager.to_string(),
                    "branch": branch,
                }),
                &self.redirect(),
            )
            .await?;

        let profile = Profile::create(
            &self.pool,
            &CreateProfile {
                id: user.id,
                email,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                contact_number: Some(form.contact_number.trim().to_string()),
                role: UserRole::ApartmentManager,
                branch: Some(branch.to_string()),
            },
        )
        .await?;

        info!(user_id = %profile.id, branch = %branch, "Apartment manager invited");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use db::DBService;
    use serde_json::Value;

    use super::*;
    use crate::services::{
        identity::{IdentitySession, IdentityUser},
        test_support::seed_tenant,
    };

    #[derive(Default)]
    struct InviteOnly {
        invited: Mutex<Vec<(String, Value)>>,
        /// Inserts a tenant with the invited e-mail while the invite is in
        /// flight, as a concurrent request would.
        racing_pool: Option<SqlitePool>,
    }

    #[async_trait]
    impl IdentityProvider for InviteOnly {
        async fn sign_up(&self, _: &str, _: &str, _: Value, _: &str) -> Result<IdentityUser, IdentityError> {
            unreachable!()
        }
        async fn sign_in(&self, _: &str, _: &str) -> Result<IdentitySession, IdentityError> {
            unreachable!()
        }
        async fn sign_out(&self, _: &str) -> Result<(), IdentityError> {
            unreachable!()
        }
        async fn resend_confirmation(&self, _: &str, _: &str) -> Result<(), IdentityError> {
            unreachable!()
        }
        async fn invite(
            &self,
            email: &str,
            metadata: Value,
            _redirect_to: &str,
        ) -> Result<IdentityUser, IdentityError> {
            self.invited.lock().unwrap().push((email.to_string(), metadata));
            if let Some(pool) = &self.racing_pool {
                seed_tenant(pool, email, "cainta").await;
            }
            Ok(IdentityUser {
                id: Uuid::new_v4(),
                email: email.to_string(),
                email_confirmed: false,
            })
        }
    }

    fn tenant_form(email: &str) -> NewTenant {
        NewTenant {
            first_name: "Carla".into(),
            last_name: "Ramos".into(),
            email: email.into(),
            contact_number: "09175550000".into(),
            branch: None,
            occupation: None,
            emergency_contact_name: None,
            emergency_contact_number: None,
        }
    }

    #[tokio::test]
    async fn tenant_invitation_links_profile_and_record() {
        let db = DBService::new_in_memory().await.unwrap();
        let identity = Arc::new(InviteOnly::default());
        let service = InviteService::new(db.pool.clone(), identity.clone(), "http://localhost:5173");
        let scope = BranchScope::Branch("cainta".into());

        let invitation = service
            .invite_tenant(&scope, tenant_form("carla@example.com"))
            .await
            .unwrap();
        assert_eq!(invitation.tenant.profile_id, Some(invitation.profile.id));
        assert_eq!(invitation.profile.role, UserRole::Tenant);
        assert_eq!(invitation.profile.branch.as_deref(), Some("cainta"));
        assert_eq!(identity.invited.lock().unwrap()[0].1["role"], "tenant");

        let err = service
            .invite_tenant(&scope, tenant_form("carla@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, InviteError::AccountExists));
        assert_eq!(identity.invited.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_tenant_insert_leaves_no_profile_behind() {
        let db = DBService::new_in_memory().await.unwrap();
        let identity = Arc::new(InviteOnly {
            racing_pool: Some(db.pool.clone()),
            ..Default::default()
        });
        let service = InviteService::new(db.pool.clone(), identity, "http://localhost:5173");
        let scope = BranchScope::Branch("cainta".into());

        let err = service
            .invite_tenant(&scope, tenant_form("carla@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, InviteError::Database(_)));
        assert!(
            Profile::find_by_email(&db.pool, "carla@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn manager_invitation_requires_branch() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = InviteService::new(db.pool.clone(), Arc::new(InviteOnly::default()), "http://x");
        let mut form = NewManager {
            first_name: "Dan".into(),
            last_name: "Lim".into(),
            email: "dan@example.com".into(),
            contact_number: "09176660000".into(),
            branch: " ".into(),
        };
        assert!(matches!(
            service.invite_apartment_manager(form.clone()).await,
            Err(InviteError::Validation(_))
        ));

        form.branch = "cubao".into();
        let profile = service.invite_apartment_manager(form).await.unwrap();
        assert_eq!(profile.role, UserRole::ApartmentManager);
        assert_eq!(profile.branch.as_deref(), Some("cubao"));
    }
}
