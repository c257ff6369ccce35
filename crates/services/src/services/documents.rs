//! Tenant document uploads kept in object storage with a metadata row.

use std::sync::Arc;

use bytes::Bytes;
use db::models::{
    document::{CreateDocument, Document, DocumentType},
    tenant::Tenant,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    config::StorageConfig,
    storage::{ObjectStore, StorageError},
};

pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

const MAX_FILE_NAME_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document not found")]
    NotFound,
    #[error("Only JPEG, PNG and PDF files are allowed (got {0})")]
    UnsupportedType(String),
    #[error("File is larger than the {max_bytes} byte limit")]
    TooLarge { max_bytes: usize },
    #[error("File is empty")]
    Empty,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl Upload {
    pub fn validate(&self, max_bytes: usize) -> Result<(), DocumentError> {
        let content_type = self.content_type.trim().to_ascii_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(DocumentError::UnsupportedType(self.content_type.clone()));
        }
        if self.data.is_empty() {
            return Err(DocumentError::Empty);
        }
        if self.data.len() > max_bytes {
            return Err(DocumentError::TooLarge { max_bytes });
        }
        Ok(())
    }
}

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`, dropping any
/// directory part.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed: String = out
        .trim_start_matches(['.', '_'])
        .chars()
        .take(MAX_FILE_NAME_LEN)
        .collect();
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed
    }
}

pub fn object_path(tenant_id: Uuid, file_name: &str) -> String {
    format!("{tenant_id}/{}-{}", Uuid::new_v4(), sanitize_file_name(file_name))
}

#[derive(Clone)]
pub struct DocumentService {
    pool: SqlitePool,
    store: Arc<dyn ObjectStore>,
    bucket: String,
    max_upload_bytes: usize,
    signed_url_ttl_secs: u64,
}

impl DocumentService {
    pub fn new(pool: SqlitePool, store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            pool,
            store,
            bucket: config.documents_bucket.clone(),
            max_upload_bytes: config.max_upload_bytes,
            signed_url_ttl_secs: config.signed_url_ttl_secs,
        }
    }

    pub async fn upload(
        &self,
        tenant: &Tenant,
        document_type: DocumentType,
        upload: Upload,
        uploaded_by: Option<Uuid>,
    ) -> Result<Document, DocumentError> {
        upload.validate(self.max_upload_bytes)?;

        let path = object_path(tenant.id, &upload.file_name);
        let size_bytes = upload.data.len() as i64;
        self.store
            .upload(&self.bucket, &path, &upload.content_type, upload.data)
            .await?;

        let created = Document::create(
            &self.pool,
            Uuid::new_v4(),
            &CreateDocument {
                tenant_id: tenant.id,
                document_type,
                file_name: upload.file_name,
                storage_path: path.clone(),
                content_type: upload.content_type,
                size_bytes,
                uploaded_by,
            },
        )
        .await;

        let document = match created {
            Ok(document) => document,
            Err(e) => {
                if let Err(cleanup) = self.store.remove(&self.bucket, &path).await {
                    warn!(path = %path, error = %cleanup, "Failed to remove orphaned upload");
                }
                return Err(e.into());
            }
        };

        if document_type == DocumentType::ValidId {
            Tenant::set_valid_id_document(&self.pool, tenant.id, Some(document.id)).await?;
        }

        info!(
            tenant_id = %tenant.id,
            document_id = %document.id,
            document_type = %document_type,
            "Document uploaded"
        );
        Ok(document)
    }

    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Document>, DocumentError> {
        Ok(Document::list_by_tenant(&self.pool, tenant_id).await?)
    }

    pub async fn find(&self, id: Uuid) -> Result<Document, DocumentError> {
        Document::find_by_id(&self.pool, id)
            .await?
            .ok_or(DocumentError::NotFound)
    }

    pub async fn signed_url(&self, document: &Document) -> Result<String, DocumentError> {
        Ok(self
            .store
            .signed_url(&self.bucket, &document.storage_path, self.signed_url_ttl_secs)
            .await?)
    }

    /// Removes the stored object first, then the row.
    pub async fn delete(&self, document: &Document) -> Result<(), DocumentError> {
        match self.store.remove(&self.bucket, &document.storage_path).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        Document::delete(&self.pool, document.id).await?;

        if let Some(tenant) = Tenant::find_by_id(&self.pool, document.tenant_id).await?
            && tenant.valid_id_document_id == Some(document.id)
        {
            Tenant::set_valid_id_document(&self.pool, tenant.id, None).await?;
        }
        info!(document_id = %document.id, "Document deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;
    use crate::services::test_support::{MemoryStore, seed_tenant};

    fn storage_config() -> StorageConfig {
        StorageConfig {
            documents_bucket: "tenant-documents".into(),
            receipts_bucket: "payment-receipts".into(),
            max_upload_bytes: 16,
            signed_url_ttl_secs: 60,
        }
    }

    fn pdf(bytes: &'static [u8]) -> Upload {
        Upload {
            file_name: "../My Lease (final).pdf".into(),
            content_type: "application/pdf".into(),
            data: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn file_names_are_sanitised() {
        assert_eq!(sanitize_file_name("../My Lease (final).pdf"), "My_Lease_final_.pdf");
        assert_eq!(sanitize_file_name("C:\\scans\\id.png"), "id.png");
        assert_eq!(sanitize_file_name("...."), "file");
    }

    #[test]
    fn uploads_are_checked_for_type_and_size() {
        assert!(pdf(b"%PDF-1.7").validate(16).is_ok());
        assert!(matches!(
            pdf(b"%PDF-1.7 but far too long").validate(16),
            Err(DocumentError::TooLarge { max_bytes: 16 })
        ));
        let gif = Upload {
            content_type: "image/gif".into(),
            ..pdf(b"GIF89a")
        };
        assert!(matches!(gif.validate(16), Err(DocumentError::UnsupportedType(_))));
        assert!(matches!(pdf(b"").validate(16), Err(DocumentError::Empty)));
    }

    #[tokio::test]
    async fn valid_id_upload_links_tenant_and_delete_unlinks() {
        let db = DBService::new_in_memory().await.unwrap();
        let store = MemoryStore::default();
        let service = DocumentService::new(db.pool.clone(), Arc::new(store.clone()), &storage_config());
        let tenant = seed_tenant(&db.pool, "rosa@example.com", "cainta").await;

        let document = service
            .upload(&tenant, DocumentType::ValidId, pdf(b"%PDF-1.7"), None)
            .await
            .unwrap();
        assert!(document.storage_path.starts_with(&format!("{}/", tenant.id)));
        assert!(document.storage_path.ends_with("-My_Lease_final_.pdf"));
        assert!(store.contains("tenant-documents", &document.storage_path));

        let linked = Tenant::find_by_id(&db.pool, tenant.id).await.unwrap().unwrap();
        assert_eq!(linked.valid_id_document_id, Some(document.id));

        let url = service.signed_url(&document).await.unwrap();
        assert!(url.contains("expires=60"));

        service.delete(&document).await.unwrap();
        assert!(!store.contains("tenant-documents", &document.storage_path));
        assert!(service.list(tenant.id).await.unwrap().is_empty());
        let unlinked = Tenant::find_by_id(&db.pool, tenant.id).await.unwrap().unwrap();
        assert_eq!(unlinked.valid_id_document_id, None);
    }
}
