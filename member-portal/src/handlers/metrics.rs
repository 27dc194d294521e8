use axum::response::IntoResponse;

pub async fn metrics() -> impl IntoResponse {
    site_core::metrics::gather()
}
