//! Bucket-based object storage for tenant documents and payment receipts.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use super::baas::{BaasAuth, BaasClient, BaasError};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] BaasError),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), StorageError>;

    /// Time-limited URL for a private object
    async fn signed_url(&self, bucket: &str, path: &str, expires_in_secs: u64)
    -> Result<String, StorageError>;

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StorageError>;
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

#[derive(Clone)]
pub struct SupabaseStorage {
    client: BaasClient,
}

impl SupabaseStorage {
    pub fn new(client: BaasClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), StorageError> {
        self.client
            .upload(
                &format!("/storage/v1/object/{}/{}", bucket, encode_path(path)),
                BaasAuth::ServiceRole,
                content_type,
                data,
                false,
            )
            .await?;
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in_secs: u64,
    ) -> Result<String, StorageError> {
        let body = json!({ "expiresIn": expires_in_secs });
        let res: SignedUrlResponse = self
            .client
            .json(
                Method::POST,
                &format!("/storage/v1/object/sign/{}/{}", bucket, encode_path(path)),
                BaasAuth::ServiceRole,
                Some(&body),
            )
            .await
            .map_err(|e| match e.status() {
                Some(400 | 404) => StorageError::NotFound(path.to_string()),
                _ => StorageError::Unavailable(e),
            })?;
        Ok(format!("{}/storage/v1{}", self.client.base_url(), res.signed_url))
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        let body = json!({ "prefixes": [path] });
        self.client
            .send(
                Method::DELETE,
                &format!("/storage/v1/object/{bucket}"),
                BaasAuth::ServiceRole,
                Some(&body),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_each_path_segment() {
        assert_eq!(
            encode_path("a1b2/receipt march.pdf"),
            "a1b2/receipt%20march.pdf"
        );
    }
}
