//! Document upload: the multipart handler and the object/row pairing.

mod common;

use async_trait::async_trait;
use common::TestApp;
use member_portal::models::{Document, Role};
use member_portal::services::documents::{DocumentRepository, DocumentStore};
use member_portal::services::storage::LocalStorage;
use secrecy::Secret;
use site_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn admin_uploads_a_document() {
    let app = TestApp::spawn().await;
    app.seed_user("admin@example.com", "secret1", Role::Admin)
        .await;

    let admin = app.client();
    app.login(&admin, "admin@example.com", "secret1").await;

    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"%PDF-1.4 minutes".to_vec())
                .file_name("March Minutes.pdf"),
        )
        .text("name", "Minutes of the March Meeting")
        .text("description", "Approved at the April meeting.");

    let response = admin
        .post(format!("{}/members/admin/documents", app.address))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);

    let listed = app.documents.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Minutes of the March Meeting");
    assert!(listed[0].storage_key.ends_with("_March_Minutes.pdf"));

    let page = admin
        .get(format!("{}/members/admin", app.address))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Minutes of the March Meeting"));
    assert!(page.contains("Approved at the April meeting."));
}

#[tokio::test]
async fn upload_without_a_file_is_rejected() {
    let app = TestApp::spawn().await;
    app.seed_user("admin@example.com", "secret1", Role::Admin)
        .await;

    let admin = app.client();
    app.login(&admin, "admin@example.com", "secret1").await;

    let form = reqwest::multipart::Form::new().text("name", "No file attached");
    let response = admin
        .post(format!("{}/members/admin/documents", app.address))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    assert!(app.documents.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_with_a_blank_name_is_rejected() {
    let app = TestApp::spawn().await;
    app.seed_user("admin@example.com", "secret1", Role::Admin)
        .await;

    let admin = app.client();
    app.login(&admin, "admin@example.com", "secret1").await;

    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"data".to_vec()).file_name("a.pdf"),
        )
        .text("name", "   ");
    let response = admin
        .post(format!("{}/members/admin/documents", app.address))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn admin_deletes_a_document() {
    let app = TestApp::spawn().await;
    app.seed_user("admin@example.com", "secret1", Role::Admin)
        .await;

    let document = app
        .documents
        .upload(b"bytes".to_vec(), "report.pdf", "Report", None)
        .await
        .unwrap();

    let admin = app.client();
    app.login(&admin, "admin@example.com", "secret1").await;

    let response = admin
        .post(format!(
            "{}/members/admin/documents/{}/delete",
            app.address, document.id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);

    assert!(app.documents.list().await.unwrap().is_empty());
}

/// Store whose inserts always fail, to exercise the upload compensation.
struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn insert(&self, _document: &Document) -> Result<(), AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!(
            "insert rejected for test"
        )))
    }

    async fn get(&self, _id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(None)
    }

    async fn list(&self) -> Result<Vec<Document>, AppError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _id: Uuid) -> Result<(), AppError> {
        Ok(())
    }
}

#[tokio::test]
async fn failed_metadata_insert_removes_the_object() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
    let repository = DocumentRepository::new(
        Arc::new(FailingStore),
        storage,
        Secret::new("test-secret".to_string()),
        3600,
        "http://localhost".to_string(),
    );

    let err = repository
        .upload(b"bytes".to_vec(), "report.pdf", "Report", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));

    // The orphaned object was cleaned up.
    let leftover = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftover, 0);
}
