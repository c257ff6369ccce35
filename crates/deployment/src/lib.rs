//! Wires the database, configuration, external providers and services into
//! one cheaply cloneable handle used as the router state.

use std::sync::Arc;

use async_trait::async_trait;
use db::{DBService, DBServiceError};
use services::services::{
    auth::{AuthService, TokenVerifier},
    baas::{BaasClient, BaasError},
    config::Config,
    dashboard::DashboardService,
    database_validator::DatabaseValidator,
    delivery::{EmailSender, FunctionEmailSender, SmsSender, UnimplementedSms},
    documents::DocumentService,
    identity::{GoTrueIdentity, IdentityProvider},
    invites::InviteService,
    ledger::LedgerService,
    maintenance::MaintenanceService,
    notifications::NotificationService,
    occupancy::OccupancyService,
    payments::PaymentService,
    storage::{ObjectStore, SupabaseStorage},
    tenants::TenantService,
    units::UnitService,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DBServiceError),
    #[error(transparent)]
    Baas(#[from] BaasError),
}

#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new(config: Config) -> Result<Self, DeploymentError>;

    fn db(&self) -> &DBService;

    fn config(&self) -> &Config;

    fn auth(&self) -> &AuthService;

    fn invites(&self) -> &InviteService;

    fn tenants(&self) -> &TenantService;

    fn units(&self) -> &UnitService;

    fn occupancy(&self) -> &OccupancyService;

    fn ledger(&self) -> &LedgerService;

    fn payments(&self) -> &PaymentService;

    fn maintenance(&self) -> &MaintenanceService;

    fn notifications(&self) -> &NotificationService;

    fn documents(&self) -> &DocumentService;

    fn dashboards(&self) -> &DashboardService;

    fn database_validator(&self) -> &DatabaseValidator;
}

/// External collaborators; swapped for in-process fakes in tests.
#[derive(Clone)]
pub struct Providers {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn ObjectStore>,
    pub email: Arc<dyn EmailSender>,
    pub sms: Arc<dyn SmsSender>,
}

impl Providers {
    /// Hosted identity, storage and e-mail function behind one HTTP client.
    pub fn hosted(config: &Config) -> Result<Self, BaasError> {
        let client = BaasClient::new(&config.supabase)?;
        Ok(Self {
            identity: Arc::new(GoTrueIdentity::new(client.clone())),
            store: Arc::new(SupabaseStorage::new(client.clone())),
            email: Arc::new(FunctionEmailSender::new(
                client,
                config.supabase.email_function.clone(),
            )),
            sms: Arc::new(UnimplementedSms),
        })
    }
}

struct Inner {
    db: DBService,
    config: Config,
    auth: AuthService,
    invites: InviteService,
    tenants: TenantService,
    units: UnitService,
    occupancy: OccupancyService,
    ledger: LedgerService,
    payments: PaymentService,
    maintenance: MaintenanceService,
    notifications: NotificationService,
    documents: DocumentService,
    dashboards: DashboardService,
    database_validator: DatabaseValidator,
}

#[derive(Clone)]
pub struct PrimeLivingDeployment {
    inner: Arc<Inner>,
}

impl PrimeLivingDeployment {
    pub fn with_providers(db: DBService, config: Config, providers: Providers) -> Self {
        let pool = db.pool.clone();
        let due_day = config.rent_due_day;

        let inner = Inner {
            auth: AuthService::new(
                pool.clone(),
                providers.identity.clone(),
                TokenVerifier::new(&config.supabase.jwt_secret),
                config.site_url.clone(),
            ),
            invites: InviteService::new(pool.clone(), providers.identity, config.site_url.clone()),
            tenants: TenantService::new(pool.clone()),
            units: UnitService::new(pool.clone()),
            occupancy: OccupancyService::new(pool.clone()),
            ledger: LedgerService::new(pool.clone(), due_day),
            payments: PaymentService::new(pool.clone(), providers.store.clone(), &config.storage),
            maintenance: MaintenanceService::new(pool.clone()),
            notifications: NotificationService::new(
                pool.clone(),
                providers.email,
                providers.sms,
                due_day,
            ),
            documents: DocumentService::new(pool.clone(), providers.store, &config.storage),
            dashboards: DashboardService::new(pool.clone(), due_day),
            database_validator: DatabaseValidator::new(pool),
            db,
            config,
        };

        Self {
            inner: Arc::new(inner),
        }
    }
}

#[async_trait]
impl Deployment for PrimeLivingDeployment {
    async fn new(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;
        let providers = Providers::hosted(&config)?;
        info!(
            database = %config.database_url,
            backend = %config.supabase.url,
            rent_due_day = config.rent_due_day,
            "Deployment initialised"
        );
        Ok(Self::with_providers(db, config, providers))
    }

    fn db(&self) -> &DBService {
        &self.inner.db
    }

    fn config(&self) -> &Config {
        &self.inner.config
    }

    fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    fn invites(&self) -> &InviteService {
        &self.inner.invites
    }

    fn tenants(&self) -> &TenantService {
        &self.inner.tenants
    }

    fn units(&self) -> &UnitService {
        &self.inner.units
    }

    fn occupancy(&self) -> &OccupancyService {
        &self.inner.occupancy
    }

    fn ledger(&self) -> &LedgerService {
        &self.inner.ledger
    }

    fn payments(&self) -> &PaymentService {
        &self.inner.payments
    }

    fn maintenance(&self) -> &MaintenanceService {
        &self.inner.maintenance
    }

    fn notifications(&self) -> &NotificationService {
        &self.inner.notifications
    }

    fn documents(&self) -> &DocumentService {
        &self.inner.documents
    }

    fn dashboards(&self) -> &DashboardService {
        &self.inner.dashboards
    }

    fn database_validator(&self) -> &DatabaseValidator {
        &self.inner.database_validator
    }
}
