use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use site_core::error::AppError;
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignedDownloadQuery {
    pub signature: String,
    pub expires: i64,
}

/// Download via a signed link. No session required: the signature itself
/// is the capability, scoped to one document until `expires`.
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SignedDownloadQuery>,
) -> Result<Response, AppError> {
    let (document, data) = state
        .documents
        .download(id, &query.signature, query.expires, Utc::now().timestamp())
        .await
        .map_err(|e| {
            tracing::warn!(document_id = %id, error = %e, "Signed download rejected");
            e
        })?;

    tracing::info!(
        document_id = %id,
        size = data.len(),
        "Signed download served"
    );

    Ok((
        StatusCode::OK,
        [
            ("content-type", "application/octet-stream".to_string()),
            (
                "content-disposition",
                format!("attachment; filename=\"{}\"", document.file_name()),
            ),
        ],
        data,
    )
        .into_response())
}
