use dotenvy::dotenv;
use member_portal::config::get_configuration;
use member_portal::services::documents::{DocumentRepository, PgDocumentStore};
use member_portal::services::identity::HttpIdentityGateway;
use member_portal::services::notify::{LogNotifier, NotificationSink, SmtpNotifier};
use member_portal::services::profiles::PgProfileStore;
use member_portal::services::storage::LocalStorage;
use member_portal::startup::build_router;
use member_portal::{db, AppState};
use site_core::observability::init_tracing;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing("member-portal", "info");
    site_core::metrics::init_metrics();

    let pool = db::create_pool(&configuration.database).await?;
    db::run_migrations(&pool).await?;

    let profiles = Arc::new(PgProfileStore::new(pool.clone()));
    let document_store = Arc::new(PgDocumentStore::new(pool));
    let storage = Arc::new(LocalStorage::new(configuration.storage.local_path.clone()).await?);
    let documents = Arc::new(DocumentRepository::new(
        document_store,
        storage,
        configuration.documents.signing_secret.clone(),
        configuration.documents.url_ttl_seconds,
        configuration.server.public_base_url.clone(),
    ));
    let identity = Arc::new(HttpIdentityGateway::new(configuration.identity.url.clone()));

    let notifier: Arc<dyn NotificationSink> = if configuration.notifications.enabled {
        Arc::new(SmtpNotifier::new(
            &configuration.notifications,
            configuration.server.public_base_url.clone(),
        )?)
    } else {
        Arc::new(LogNotifier)
    };

    let state = AppState::new(identity, profiles, documents, notifier);
    let app = build_router(state);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting member-portal on {}", address);
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
