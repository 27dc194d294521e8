use askama::Template;
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use site_core::error::AppError;
use uuid::Uuid;

use crate::access;
use crate::models::{AuthUser, Profile, Role};
use crate::services::identity::IdentityError;
use crate::AppState;

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub pending: Vec<PendingView>,
    pub pending_count: usize,
    pub documents: Vec<AdminDocumentView>,
}

pub struct PendingView {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub signed_up: String,
}

pub struct AdminDocumentView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub uploaded_on: String,
}

/// Server-side role re-check for every mutating action. The gate's
/// routing is the first line of defense; the handlers never rely on it
/// alone.
async fn require_admin(state: &AppState, auth_user: &AuthUser) -> Result<Profile, AppError> {
    let profile = state
        .profiles
        .get(auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden(anyhow::anyhow!("no profile for caller")))?;

    if profile.role != Role::Admin {
        return Err(AppError::Forbidden(anyhow::anyhow!("admin role required")));
    }
    Ok(profile)
}

pub async fn admin_page(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Response, AppError> {
    require_admin(&state, &auth_user).await?;

    let pending: Vec<PendingView> = state
        .profiles
        .list_by_role(Role::Pending)
        .await?
        .into_iter()
        .map(|profile| PendingView {
            user_id: profile.user_id.to_string(),
            name: profile.display_name.clone().unwrap_or_else(|| "—".into()),
            email: profile.email.clone(),
            signed_up: profile.created_at.format("%d %b %Y").to_string(),
        })
        .collect();

    let documents: Vec<AdminDocumentView> = state
        .documents
        .list()
        .await?
        .into_iter()
        .map(|document| AdminDocumentView {
            id: document.id.to_string(),
            name: document.name,
            description: document.description,
            uploaded_on: document.created_at.format("%d %b %Y").to_string(),
        })
        .collect();

    let template = AdminTemplate {
        pending_count: pending.len(),
        pending,
        documents,
    };
    Ok(template.into_response())
}

pub async fn approve_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    require_admin(&state, &auth_user).await?;

    match state.profiles.get(user_id).await? {
        Some(profile) if profile.role == Role::Pending => {
            state.profiles.set_role(user_id, Role::Member).await?;
            tracing::info!(
                user_id = %user_id,
                approved_by = %auth_user.user_id,
                "User approved"
            );
        }
        Some(profile) => {
            // Already approved; a repeated click is not an error.
            tracing::debug!(user_id = %user_id, role = %profile.role.as_str(), "Approve is a no-op");
        }
        None => {
            tracing::debug!(user_id = %user_id, "Approve of missing profile is a no-op");
        }
    }

    Ok(Redirect::to(access::ADMIN_AREA))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    require_admin(&state, &auth_user).await?;

    // Identity and profile are removed together; a half that is already
    // gone is the desired end state.
    match state.identity.delete_identity(user_id).await {
        Ok(()) | Err(IdentityError::NotFound) => {}
        Err(e) => return Err(AppError::BadGateway(e.to_string())),
    }
    state.profiles.delete(user_id).await?;

    tracing::info!(
        user_id = %user_id,
        deleted_by = %auth_user.user_id,
        "User deleted"
    );

    Ok(Redirect::to(access::ADMIN_AREA))
}

pub async fn upload_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    require_admin(&state, &auth_user).await?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut name = String::new();
    let mut description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("failed to read form field: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("failed to read file bytes: {}", e))
                })?;
                file = Some((file_name, data.to_vec()));
            }
            Some("name") => {
                name = field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("failed to read name field: {}", e))
                })?;
            }
            Some("description") => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("failed to read description field: {}", e))
                })?;
                let text = text.trim().to_string();
                if !text.is_empty() {
                    description = Some(text);
                }
            }
            _ => {}
        }
    }

    let (file_name, data) = file
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("no file in upload")))?;

    let document = state
        .documents
        .upload(data, &file_name, &name, description)
        .await?;

    tracing::info!(
        document_id = %document.id,
        uploaded_by = %auth_user.user_id,
        "Document uploaded by admin"
    );

    Ok(Redirect::to(access::ADMIN_AREA))
}

pub async fn delete_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    require_admin(&state, &auth_user).await?;

    state.documents.delete(id).await?;

    tracing::info!(
        document_id = %id,
        deleted_by = %auth_user.user_id,
        "Document deleted by admin"
    );

    Ok(Redirect::to(access::ADMIN_AREA))
}
