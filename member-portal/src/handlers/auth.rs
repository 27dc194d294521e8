use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use site_core::error::AppError;
use tower_sessions::Session;
use validator::Validate;

use crate::access;
use crate::models::profile::{
    AuthUser, Profile, SESSION_DISPLAY_NAME, SESSION_EMAIL, SESSION_USER_ID,
};
use crate::services::identity::IdentityError;
use crate::services::notify::{self, PendingSignup};
use crate::AppState;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {}

#[derive(Template)]
#[template(path = "pending.html")]
pub struct PendingTemplate {
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct SignupForm {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

pub async fn login_page() -> impl IntoResponse {
    LoginTemplate {}
}

pub async fn signup_page() -> impl IntoResponse {
    SignupTemplate {}
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = state
        .identity
        .sign_in(&form.email, &form.password)
        .await
        .map_err(map_identity_error)?;

    store_session(&session, user.user_id, &user.email, user.display_name.as_deref()).await?;

    tracing::info!(user_id = %user.user_id, "User logged in");

    // The gate sends pending users on to the status page from here.
    Ok(Redirect::to(access::MEMBER_HOME).into_response())
}

pub async fn signup_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    form.validate()?;

    let user_id = state
        .identity
        .sign_up(&form.email, &form.password, Some(&form.full_name))
        .await
        .map_err(map_identity_error)?;

    let profile = Profile::new(user_id, form.email.clone(), Some(form.full_name.clone()));

    if let Err(e) = state.profiles.insert(&profile).await {
        // An identity without a profile would be unroutable; undo the
        // sign-up and surface the failure.
        tracing::error!(user_id = %user_id, error = %e, "Profile creation failed after sign-up");
        if let Err(cleanup) = state.identity.delete_identity(user_id).await {
            tracing::error!(user_id = %user_id, error = %cleanup, "Failed to remove identity");
        }
        return Err(e);
    }

    notify::spawn_notify(
        state.notifier.clone(),
        PendingSignup {
            user_id,
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            created_at: profile.created_at,
        },
    );

    store_session(&session, user_id, &profile.email, profile.display_name.as_deref()).await?;

    tracing::info!(user_id = %user_id, "User signed up, awaiting approval");

    Ok(Redirect::to(access::PENDING_LANDING).into_response())
}

pub async fn logout_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    if let Some(user_id) = session.get(SESSION_USER_ID).await.unwrap_or(None) {
        // Best effort; the session is cleared either way.
        if let Err(e) = state.identity.sign_out(user_id).await {
            tracing::warn!(user_id = %user_id, error = %e, "Identity sign-out failed");
        }
    }

    session.clear().await;

    Ok(Redirect::to(access::LOGIN).into_response())
}

pub async fn pending_page(auth_user: AuthUser) -> impl IntoResponse {
    PendingTemplate {
        email: auth_user.email,
    }
}

async fn store_session(
    session: &Session,
    user_id: uuid::Uuid,
    email: &str,
    display_name: Option<&str>,
) -> Result<(), AppError> {
    session
        .insert(SESSION_USER_ID, user_id)
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("session write failed: {}", e)))?;
    session
        .insert(SESSION_EMAIL, email)
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("session write failed: {}", e)))?;
    if let Some(name) = display_name {
        session
            .insert(SESSION_DISPLAY_NAME, name)
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("session write failed: {}", e)))?;
    }
    Ok(())
}

fn map_identity_error(err: IdentityError) -> AppError {
    match err {
        IdentityError::DuplicateEmail => AppError::Conflict(anyhow::anyhow!("{}", err)),
        IdentityError::WeakCredential => AppError::BadRequest(anyhow::anyhow!("{}", err)),
        IdentityError::InvalidCredential => AppError::Unauthorized(anyhow::anyhow!("{}", err)),
        IdentityError::NotFound => AppError::NotFound(anyhow::anyhow!("{}", err)),
        IdentityError::Unavailable(msg) => AppError::BadGateway(msg),
    }
}
