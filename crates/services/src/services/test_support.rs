//! Seed helpers and in-process provider fakes shared by service tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use db::models::{
    tenant::{CreateTenant, Tenant},
    unit::{CreateUnit, Unit},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{
    delivery::{DeliveryError, EmailMessage, EmailSender},
    storage::{ObjectStore, StorageError},
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn seed_tenant(pool: &SqlitePool, email: &str, branch: &str) -> Tenant {
    let first = email.split('@').next().unwrap_or("tenant");
    let mut first_name = first.to_string();
    if let Some(c) = first_name.get_mut(0..1) {
        c.make_ascii_uppercase();
    }
    Tenant::create(
        pool,
        Uuid::new_v4(),
        &CreateTenant {
            first_name,
            last_name: "Cruz".into(),
            email: email.into(),
            contact_number: "09171234567".into(),
            branch: branch.into(),
            occupation: None,
            emergency_contact_name: None,
            emergency_contact_number: None,
            profile_id: None,
        },
    )
    .await
    .unwrap()
}

pub async fn seed_unit(pool: &SqlitePool, number: &str, branch: &str, rent_cents: i64) -> Unit {
    Unit::create(
        pool,
        Uuid::new_v4(),
        &CreateUnit {
            unit_number: number.into(),
            unit_type: "Studio".into(),
            monthly_rent_cents: rent_cents,
            branch: branch.into(),
        },
    )
    .await
    .unwrap()
}

/// Keeps uploaded objects in memory keyed by `bucket/path`.
#[derive(Default, Clone)]
pub struct MemoryStore {
    pub objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryStore {
    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&format!("{bucket}/{path}"))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        _content_type: &str,
        data: Bytes,
    ) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{path}"), data);
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in_secs: u64,
    ) -> Result<String, StorageError> {
        if !self.contains(bucket, path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(format!("memory://{bucket}/{path}?expires={expires_in_secs}"))
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .remove(&format!("{bucket}/{path}"));
        Ok(())
    }
}

/// Records every e-mail; addresses listed in `failing` are rejected.
#[derive(Default, Clone)]
pub struct RecordingEmail {
    pub sent: Arc<Mutex<Vec<EmailMessage>>>,
    pub failing: Vec<String>,
}

#[async_trait]
impl EmailSender for RecordingEmail {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), DeliveryError> {
        if self.failing.iter().any(|f| f == &email.to) {
            return Err(DeliveryError::Rejected("mailbox unavailable".into()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
