//! Profile model - one row per identity, carrying the authorization role.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::access;

/// Session keys for the logged-in identity.
pub const SESSION_USER_ID: &str = "user_id";
pub const SESSION_EMAIL: &str = "email";
pub const SESSION_DISPLAY_NAME: &str = "display_name";

/// Authorization role codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Pending,
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Pending => "pending",
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    pub fn parse(code: &str) -> Option<Role> {
        match code {
            "pending" => Some(Role::Pending),
            "member" => Some(Role::Member),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Profile entity. Created at sign-up with role `pending`; the role only
/// moves forward (approval) or the whole row is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Create a new profile in the pending queue.
    pub fn new(user_id: Uuid, email: String, display_name: Option<String>) -> Self {
        Self {
            user_id,
            email,
            display_name,
            role: Role::Pending,
            created_at: Utc::now(),
        }
    }

    /// First word of the display name, for greetings.
    pub fn first_name(&self) -> &str {
        self.display_name
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
            .unwrap_or("Member")
    }
}

/// Authenticated identity extracted from the session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to extract session",
                )
                    .into_response()
            })?;

        let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.unwrap_or(None);
        let email: Option<String> = session.get(SESSION_EMAIL).await.unwrap_or(None);

        match (user_id, email) {
            (Some(user_id), Some(email)) => {
                let display_name: Option<String> =
                    session.get(SESSION_DISPLAY_NAME).await.unwrap_or(None);

                Ok(AuthUser {
                    user_id,
                    email,
                    display_name,
                })
            }
            _ => Err(Redirect::to(access::LOGIN).into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_codes_round_trip() {
        for role in [Role::Pending, Role::Member, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("committee"), None);
    }

    #[test]
    fn first_name_falls_back_to_member() {
        let mut profile = Profile::new(Uuid::new_v4(), "a@example.com".into(), None);
        assert_eq!(profile.first_name(), "Member");

        profile.display_name = Some("Alice Example".into());
        assert_eq!(profile.first_name(), "Alice");
    }
}
