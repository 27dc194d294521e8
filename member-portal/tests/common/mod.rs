//! Common test utilities: an app spawned on a random port with in-memory
//! backends, plus a recording notification sink.

use async_trait::async_trait;
use chrono::Utc;
use member_portal::models::{Profile, Role};
use member_portal::services::documents::{DocumentRepository, InMemoryDocumentStore};
use member_portal::services::identity::InMemoryIdentityGateway;
use member_portal::services::notify::{NotificationSink, PendingSignup};
use member_portal::services::profiles::{InMemoryProfileStore, ProfileStore};
use member_portal::services::storage::LocalStorage;
use member_portal::startup::build_router;
use member_portal::AppState;
use secrecy::Secret;
use site_core::error::AppError;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SIGNING_SECRET: &str = "test-signing-secret";

/// Sink that records every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PendingSignup>>,
}

impl RecordingSink {
    pub async fn events(&self) -> Vec<PendingSignup> {
        self.events.lock().await.clone()
    }

    /// Poll until at least `count` events arrived or `timeout` elapsed,
    /// returning whatever has been recorded by then.
    pub async fn wait_for_events(
        &self,
        count: usize,
        timeout: std::time::Duration,
    ) -> Vec<PendingSignup> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let events = self.events.lock().await.clone();
            if events.len() >= count || tokio::time::Instant::now() >= deadline {
                return events;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify_pending_signup(&self, event: &PendingSignup) -> Result<(), AppError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub address: String,
    pub identity: Arc<InMemoryIdentityGateway>,
    pub profiles: Arc<InMemoryProfileStore>,
    pub documents: Arc<DocumentRepository>,
    pub notifications: Arc<RecordingSink>,
    // Held so the backing directory outlives the app.
    #[allow(dead_code)]
    storage_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind a test port");
        let address = format!("http://{}", listener.local_addr().unwrap());

        let identity = Arc::new(InMemoryIdentityGateway::new());
        let profiles = Arc::new(InMemoryProfileStore::new());
        let notifications = Arc::new(RecordingSink::default());

        let storage_dir = TempDir::new().expect("failed to create storage dir");
        let storage = Arc::new(
            LocalStorage::new(storage_dir.path())
                .await
                .expect("failed to set up local storage"),
        );
        let documents = Arc::new(DocumentRepository::new(
            Arc::new(InMemoryDocumentStore::new()),
            storage,
            Secret::new(SIGNING_SECRET.to_string()),
            3600,
            address.clone(),
        ));

        let state = AppState::new(
            identity.clone(),
            profiles.clone(),
            documents.clone(),
            notifications.clone(),
        );
        let router = build_router(state);

        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("server stopped unexpectedly");
        });

        Self {
            address,
            identity,
            profiles,
            documents,
            notifications,
            storage_dir,
        }
    }

    /// Client with a cookie jar and no redirect following, so tests can
    /// assert on the 303s the handlers issue.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build client")
    }

    /// Seed an identity plus a profile with the given role.
    pub async fn seed_user(&self, email: &str, password: &str, role: Role) -> Uuid {
        let user_id = Uuid::new_v4();
        self.identity
            .seed_account(user_id, email, password, Some("Test User"))
            .await;

        let mut profile = Profile::new(user_id, email.to_string(), Some("Test User".to_string()));
        profile.role = role;
        profile.created_at = Utc::now();
        self.profiles
            .insert(&profile)
            .await
            .expect("failed to seed profile");
        user_id
    }

    /// Log the client in through the real login handler.
    pub async fn login(&self, client: &reqwest::Client, email: &str, password: &str) {
        let response = client
            .post(format!("{}/auth/login", self.address))
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .expect("login request failed");
        assert_eq!(
            response.status().as_u16(),
            303,
            "login did not succeed for {}",
            email
        );
    }
}
