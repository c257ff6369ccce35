use std::sync::Arc;

use chrono::NaiveDate;
use db::models::{
    contract::Contract,
    payment::{CreatePayment, Payment, PaymentMode, PaymentStatus, PaymentWithTenant},
    tenant::Tenant,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    access::{AccessError, BranchScope},
    config::StorageConfig,
    documents::{DocumentError, Upload, object_path},
    storage::{ObjectStore, StorageError},
};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment not found")]
    NotFound,
    #[error("Tenant not found")]
    TenantNotFound,
    #[error("No Contract")]
    NoContract,
    #[error("{0}")]
    Validation(String),
    #[error("Payment is already {from}")]
    InvalidTransition { from: PaymentStatus },
    #[error("Payment has no receipt")]
    NoReceipt,
    #[error(transparent)]
    Receipt(#[from] DocumentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct NewPayment {
    pub amount_cents: i64,
    pub payment_date: NaiveDate,
    pub payment_mode: PaymentMode,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct PaymentService {
    pool: SqlitePool,
    store: Arc<dyn ObjectStore>,
    bucket: String,
    max_upload_bytes: usize,
    signed_url_ttl_secs: u64,
}

impl PaymentService {
    pub fn new(pool: SqlitePool, store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            pool,
            store,
            bucket: config.receipts_bucket.clone(),
            max_upload_bytes: config.max_upload_bytes,
            signed_url_ttl_secs: config.signed_url_ttl_secs,
        }
    }

    async fn active_contract(&self, tenant_id: Uuid) -> Result<Contract, PaymentError> {
        Contract::find_active_by_tenant(&self.pool, tenant_id)
            .await?
            .ok_or(PaymentError::NoContract)
    }

    fn check_amount(payment: &NewPayment) -> Result<(), PaymentError> {
        if payment.amount_cents <= 0 {
            return Err(PaymentError::Validation("Amount must be greater than zero".into()));
        }
        Ok(())
    }

    /// Staff-recorded payment, confirmed immediately.
    pub async fn record_payment(
        &self,
        scope: &BranchScope,
        tenant_id: Uuid,
        payment: NewPayment,
        recorded_by: Uuid,
    ) -> Result<Payment, PaymentError> {
        let tenant = Tenant::find_by_id(&self.pool, tenant_id)
            .await?
            .ok_or(PaymentError::TenantNotFound)?;
        scope.ensure(&tenant.branch)?;
        Self::check_amount(&payment)?;
        let contract = self.active_contract(tenant_id).await?;

        let created = Payment::create(
            &self.pool,
            Uuid::new_v4(),
            &CreatePayment {
                tenant_id,
                contract_id: contract.id,
                amount_cents: payment.amount_cents,
                payment_date: payment.payment_date,
                payment_mode: payment.payment_mode,
                status: PaymentStatus::Confirmed,
                receipt_path: None,
                notes: payment.notes,
                reviewed_by: Some(recorded_by),
            },
        )
        .await?;

        info!(payment_id = %created.id, tenant_id = %tenant_id, amount_cents = created.amount_cents, "Payment recorded");
        Ok(created)
    }

    /// Tenant-submitted payment awaiting staff review.
    pub async fn submit_payment(
        &self,
        tenant: &Tenant,
        payment: NewPayment,
        receipt: Option<Upload>,
    ) -> Result<Payment, PaymentError> {
        Self::check_amount(&payment)?;
        let contract = self.active_contract(tenant.id).await?;

        let receipt_path = match receipt {
            Some(upload) => {
                upload.validate(self.max_upload_bytes)?;
                let path = object_path(tenant.id, &upload.file_name);
                self.store
                    .upload(&self.bucket, &path, &upload.content_type, upload.data)
                    .await?;
                Some(path)
            }
            None => None,
        };

        let created = Payment::create(
            &self.pool,
            Uuid::new_v4(),
            &CreatePayment {
                tenant_id: tenant.id,
                contract_id: contract.id,
                amount_cents: payment.amount_cents,
                payment_date: payment.payment_date,
                payment_mode: payment.payment_mode,
                status: PaymentStatus::Pending,
                receipt_path: receipt_path.clone(),
                notes: payment.notes,
                reviewed_by: None,
            },
        )
        .await;

        match created {
            Ok(created) => {
                info!(payment_id = %created.id, tenant_id = %tenant.id, "Payment submitted for review");
                Ok(created)
            }
            Err(e) => {
                if let Some(path) = receipt_path {
                    self.remove_receipt(&path).await;
                }
                Err(e.into())
            }
        }
    }

    async fn remove_receipt(&self, path: &str) {
        if let Err(e) = self.store.remove(&self.bucket, path).await {
            warn!(path = %path, error = %e, "Failed to remove receipt object");
        }
    }

    pub async fn find(&self, id: Uuid) -> Result<PaymentWithTenant, PaymentError> {
        Payment::find_with_tenant(&self.pool, id)
            .await?
            .ok_or(PaymentError::NotFound)
    }

    async fn review(
        &self,
        scope: &BranchScope,
        id: Uuid,
        status: PaymentStatus,
        reviewer: Uuid,
    ) -> Result<Payment, PaymentError> {
        let current = self.find(id).await?;
        scope.ensure(&current.branch)?;

        let reviewed = Payment::review_if_pending(&self.pool, id, status, reviewer)
            .await?
            .ok_or(PaymentError::InvalidTransition {
                from: current.payment.status,
            })?;
        info!(payment_id = %id, status = %status, reviewer = %reviewer, "Payment reviewed");
        Ok(reviewed)
    }

    pub async fn approve(
        &self,
        scope: &BranchScope,
        id: Uuid,
        reviewer: Uuid,
    ) -> Result<Payment, PaymentError> {
        self.review(scope, id, PaymentStatus::Confirmed, reviewer).await
    }

    pub async fn reject(
        &self,
        scope: &BranchScope,
        id: Uuid,
        reviewer: Uuid,
    ) -> Result<Payment, PaymentError> {
        self.review(scope, id, PaymentStatus::Rejected, reviewer).await
    }

    pub async fn list_for_branch(
        &self,
        scope: &BranchScope,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<PaymentWithTenant>, PaymentError> {
        Ok(Payment::list_with_tenant(&self.pool, scope.filter(), status).await?)
    }

    pub async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Payment>, PaymentError> {
        Ok(Payment::list_by_tenant(&self.pool, tenant_id).await?)
    }

    pub async fn delete(&self, scope: &BranchScope, id: Uuid) -> Result<(), PaymentError> {
        let current = self.find(id).await?;
        scope.ensure(&current.branch)?;
        if let Some(path) = &current.payment.receipt_path {
            self.remove_receipt(path).await;
        }
        Payment::delete(&self.pool, id).await?;
        info!(payment_id = %id, "Payment deleted");
        Ok(())
    }

    pub async fn receipt_url(&self, payment: &Payment) -> Result<String, PaymentError> {
        let path = payment.receipt_path.as_deref().ok_or(PaymentError::NoReceipt)?;
        Ok(self
            .store
            .signed_url(&self.bucket, path, self.signed_url_ttl_secs)
            .await?)
    }
}
