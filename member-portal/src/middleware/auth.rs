use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::access::{authorize, Decision, MEMBER_HOME};
use crate::models::profile::SESSION_USER_ID;
use crate::AppState;

/// Gate every request: resolve the session and, for protected paths, the
/// caller's role, then apply the pure decision. Runs fresh on each
/// request; nothing is cached and nothing is mutated here.
pub async fn access_gate(
    State(state): State<AppState>,
    session: Session,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.unwrap_or(None);

    // The role lookup only matters inside the members area.
    let role = match user_id {
        Some(user_id) if path.starts_with(MEMBER_HOME) => {
            match state.profiles.get(user_id).await {
                Ok(profile) => profile.map(|p| p.role),
                Err(e) => return e.into_response(),
            }
        }
        _ => None,
    };

    match authorize(&path, user_id.is_some(), role) {
        Decision::Allow => next.run(request).await,
        Decision::Redirect(target) => {
            tracing::debug!(path = %path, target = %target, "Access gate redirect");
            Redirect::to(target).into_response()
        }
    }
}
