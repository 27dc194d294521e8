use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use site_core::error::AppError;

use crate::access;
use crate::models::{AuthUser, Role};
use crate::AppState;

#[derive(Template)]
#[template(path = "members.html")]
pub struct MembersTemplate {
    pub first_name: String,
    pub is_admin: bool,
    pub documents: Vec<DocumentView>,
}

pub struct DocumentView {
    pub name: String,
    pub description: Option<String>,
    pub uploaded_on: String,
    pub url: String,
}

pub async fn members_page(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Response, AppError> {
    // The gate already routed pending callers away; re-check anyway so a
    // direct invocation cannot list documents.
    let profile = state.profiles.get(auth_user.user_id).await?;
    let profile = match profile {
        Some(profile) if profile.role != Role::Pending => profile,
        _ => return Ok(Redirect::to(access::PENDING_LANDING).into_response()),
    };

    let now = Utc::now();
    let mut documents = Vec::new();
    for document in state.documents.list().await? {
        let url = state.documents.signed_read_url(&document, now)?;
        documents.push(DocumentView {
            name: document.name,
            description: document.description,
            uploaded_on: document.created_at.format("%d %b %Y").to_string(),
            url,
        });
    }

    let template = MembersTemplate {
        first_name: profile.first_name().to_string(),
        is_admin: profile.role == Role::Admin,
        documents,
    };
    Ok(template.into_response())
}
