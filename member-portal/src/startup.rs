use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use site_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::handlers::{
    admin::{admin_page, approve_user, delete_document, delete_user, upload_document},
    auth::{login_handler, login_page, logout_handler, pending_page, signup_handler, signup_page},
    download::download_document,
    members::members_page,
    metrics::metrics,
    pages::{about, feedback, health_check, index, journey},
};
use crate::middleware::auth::access_gate;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    // Session setup
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false) // Set to true in production with HTTPS
        .with_expiry(Expiry::OnInactivity(Duration::hours(24)));

    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/journey", get(journey))
        .route("/feedback", get(feedback))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/auth/login", get(login_page).post(login_handler))
        .route("/auth/signup", get(signup_page).post(signup_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/pending", get(pending_page))
        .route("/members", get(members_page))
        .route("/members/admin", get(admin_page))
        .route("/members/admin/users/:id/approve", post(approve_user))
        .route("/members/admin/users/:id/delete", post(delete_user))
        .route("/members/admin/documents", post(upload_document))
        .route("/members/admin/documents/:id/delete", post(delete_document))
        .route("/documents/:id/download", get(download_document))
        // The gate runs on every request, inside the session layer.
        .layer(from_fn_with_state(state.clone(), access_gate))
        .layer(session_layer)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
