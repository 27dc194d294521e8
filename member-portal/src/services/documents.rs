//! Document repository: metadata rows paired with backing objects.
//!
//! Invariant: a row exists if and only if its object exists. Upload writes
//! the object first and compensates by deleting it when the row insert
//! fails; delete attempts both halves and reports the first failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use site_core::error::AppError;
use site_core::utils::signature::{generate_download_signature, validate_download_signature, SignatureError};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::Document;
use crate::services::storage::ObjectStorage;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, document: &Document) -> Result<(), AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError>;

    /// All documents, newest first.
    async fn list(&self) -> Result<Vec<Document>, AppError>;

    /// Remove the metadata row. Deleting an absent row is a no-op.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    storage_key: String,
    created_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            name: row.name,
            description: row.description,
            storage_key: row.storage_key,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, document: &Document) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, name, description, storage_key, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(document.id)
        .bind(&document.name)
        .bind(&document.description)
        .bind(&document.storage_key)
        .bind(document.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, name, description, storage_key, created_at FROM documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        Ok(row.map(Document::from))
    }

    async fn list(&self) -> Result<Vec<Document>, AppError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, name, description, storage_key, created_at
            FROM documents
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }
}

/// Process-local store, for tests and local runs.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<Uuid, Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, document: &Document) -> Result<(), AppError> {
        self.documents
            .write()
            .await
            .insert(document.id, document.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Document>, AppError> {
        let mut documents: Vec<Document> =
            self.documents.read().await.values().cloned().collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.documents.write().await.remove(&id);
        Ok(())
    }
}

/// Repository combining the metadata store, the object storage and the
/// signed-link issuing policy.
pub struct DocumentRepository {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
    signing_secret: Secret<String>,
    url_ttl_seconds: i64,
    public_base_url: String,
}

impl DocumentRepository {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
        signing_secret: Secret<String>,
        url_ttl_seconds: i64,
        public_base_url: String,
    ) -> Self {
        Self {
            store,
            storage,
            signing_secret,
            url_ttl_seconds,
            public_base_url,
        }
    }

    /// Store the file bytes and insert the metadata row.
    ///
    /// The row insert only happens after the object write succeeds; a
    /// failed insert deletes the orphaned object before surfacing the
    /// error.
    pub async fn upload(
        &self,
        data: Vec<u8>,
        file_name: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<Document, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "document name must not be empty"
            )));
        }

        let storage_key = format!(
            "{}_{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(file_name)
        );

        self.storage.put(&storage_key, data).await.map_err(|e| {
            tracing::error!(storage_key = %storage_key, error = %e, "Object write failed");
            e
        })?;

        let document = Document::new(name.to_string(), description, storage_key);

        if let Err(e) = self.store.insert(&document).await {
            tracing::error!(
                document_id = %document.id,
                error = %e,
                "Metadata insert failed, removing orphaned object"
            );
            if let Err(cleanup) = self.storage.remove(&document.storage_key).await {
                tracing::error!(
                    storage_key = %document.storage_key,
                    error = %cleanup,
                    "Failed to remove orphaned object"
                );
            }
            return Err(e);
        }

        tracing::info!(
            document_id = %document.id,
            name = %document.name,
            "Document uploaded"
        );
        Ok(document)
    }

    pub async fn list(&self) -> Result<Vec<Document>, AppError> {
        self.store.list().await
    }

    /// Issue a time-limited download link for one document. Links are
    /// minted per request and never persisted.
    pub fn signed_read_url(
        &self,
        document: &Document,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let expires = now.timestamp() + self.url_ttl_seconds;
        let signature = generate_download_signature(
            &document.id.to_string(),
            expires,
            self.signing_secret.expose_secret(),
        )
        .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

        Ok(format!(
            "{}/documents/{}/download?signature={}&expires={}",
            self.public_base_url, document.id, signature, expires
        ))
    }

    /// Validate a signed link and return the document plus its bytes.
    pub async fn download(
        &self,
        id: Uuid,
        signature: &str,
        expires: i64,
        now: i64,
    ) -> Result<(Document, Vec<u8>), AppError> {
        validate_download_signature(
            &id.to_string(),
            signature,
            expires,
            self.signing_secret.expose_secret(),
            now,
        )
        .map_err(|e| match e {
            SignatureError::Expired => {
                AppError::Unauthorized(anyhow::anyhow!("download link expired"))
            }
            _ => AppError::Unauthorized(anyhow::anyhow!("invalid download link")),
        })?;

        let document = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("document not found")))?;

        let data = self.storage.fetch(&document.storage_key).await?;
        Ok((document, data))
    }

    /// Delete the metadata row and the backing object. Both halves are
    /// attempted regardless of the other; absent halves are benign.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let Some(document) = self.store.get(id).await? else {
            tracing::debug!(document_id = %id, "Delete of missing document is a no-op");
            return Ok(());
        };

        let row_result = self.store.delete(id).await;
        let object_result = self.storage.remove(&document.storage_key).await;

        row_result?;
        object_result?;

        tracing::info!(document_id = %id, "Document deleted");
        Ok(())
    }
}

/// Rewrite anything outside the safe filename alphabet to `_` before the
/// name becomes part of a storage key.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rewrites_unsafe_characters() {
        assert_eq!(
            sanitize_file_name("Meeting Minutes – March 2025.pdf"),
            "Meeting_Minutes___March_2025.pdf"
        );
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("plain-name_1.txt"), "plain-name_1.txt");
        assert_eq!(sanitize_file_name(""), "unnamed");
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = InMemoryDocumentStore::new();
        let mut older = Document::new("Older".into(), None, "1_older.pdf".into());
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        let newer = Document::new("Newer".into(), None, "2_newer.pdf".into());

        store.insert(&older).await.unwrap();
        store.insert(&newer).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].name, "Newer");
        assert_eq!(listed[1].name, "Older");
    }
}
