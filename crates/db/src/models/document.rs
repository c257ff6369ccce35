use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "document_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentType {
    ValidId,
    Contract,
    Receipt,
    Other,
}

/// Metadata row for an object kept in the documents bucket
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub document_type: DocumentType,
    pub file_name: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub tenant_id: Uuid,
    pub document_type: DocumentType,
    pub file_name: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Option<Uuid>,
}

const DOCUMENT_COLUMNS: &str = "id, tenant_id, document_type, file_name, storage_path, \
     content_type, size_bytes, uploaded_by, created_at";

impl Document {
    pub async fn create(pool: &SqlitePool, id: Uuid, data: &CreateDocument) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Document>(&format!(
            r#"INSERT INTO documents (id, tenant_id, document_type, file_name, storage_path,
                                      content_type, size_bytes, uploaded_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {DOCUMENT_COLUMNS}"#
        ))
        .bind(id)
        .bind(data.tenant_id)
        .bind(data.document_type)
        .bind(&data.file_name)
        .bind(&data.storage_path)
        .bind(&data.content_type)
        .bind(data.size_bytes)
        .bind(data.uploaded_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Document>(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_tenant(pool: &SqlitePool, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE tenant_id = $1 ORDER BY created_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
