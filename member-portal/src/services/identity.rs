//! Identity gateway - the external credential store, consumed as a
//! capability interface. Credential mechanics (hashing, token issuance)
//! live on the provider side; this crate only creates, verifies and
//! deletes identities through it.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("password does not meet requirements")]
    WeakCredential,

    #[error("invalid email or password")]
    InvalidCredential,

    #[error("identity not found")]
    NotFound,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Identity returned by a successful sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedInUser {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Uuid, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser, IdentityError>;

    async fn sign_out(&self, user_id: Uuid) -> Result<(), IdentityError>;

    /// Admin-only: remove the identity entirely. Missing identities are
    /// reported as `NotFound` so callers can treat them as benign.
    async fn delete_identity(&self, user_id: Uuid) -> Result<(), IdentityError>;
}

/// HTTP client against the identity provider's REST surface.
pub struct HttpIdentityGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct RegisterResponse {
    user_id: Uuid,
}

impl HttpIdentityGateway {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl IdentityGateway for HttpIdentityGateway {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Uuid, IdentityError> {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "display_name": display_name,
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Identity provider register call failed");
                IdentityError::Unavailable(e.to_string())
            })?;

        match response.status().as_u16() {
            200 | 201 => {
                let body: RegisterResponse = response
                    .json()
                    .await
                    .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
                Ok(body.user_id)
            }
            409 => Err(IdentityError::DuplicateEmail),
            400 | 422 => Err(IdentityError::WeakCredential),
            status => Err(IdentityError::Unavailable(format!(
                "register returned {}",
                status
            ))),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser, IdentityError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Identity provider login call failed");
                IdentityError::Unavailable(e.to_string())
            })?;

        match response.status().as_u16() {
            200 => response
                .json()
                .await
                .map_err(|e| IdentityError::Unavailable(e.to_string())),
            401 | 403 => Err(IdentityError::InvalidCredential),
            status => Err(IdentityError::Unavailable(format!(
                "login returned {}",
                status
            ))),
        }
    }

    async fn sign_out(&self, user_id: Uuid) -> Result<(), IdentityError> {
        self.client
            .post(self.url("/auth/logout"))
            .json(&serde_json::json!({ "user_id": user_id }))
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn delete_identity(&self, user_id: Uuid) -> Result<(), IdentityError> {
        let response = self
            .client
            .delete(self.url(&format!("/admin/users/{}", user_id)))
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            404 => Err(IdentityError::NotFound),
            status => Err(IdentityError::Unavailable(format!(
                "delete returned {}",
                status
            ))),
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    user_id: Uuid,
    password: String,
    display_name: Option<String>,
}

/// Process-local identity store, for tests and local runs. Mirrors the
/// provider contract: duplicate emails conflict, passwords under six
/// characters are rejected.
#[derive(Default)]
pub struct InMemoryIdentityGateway {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryIdentityGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an identity with a fixed id, bypassing credential checks.
    pub async fn seed_account(
        &self,
        user_id: Uuid,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) {
        self.accounts.write().await.insert(
            email.to_lowercase(),
            Account {
                user_id,
                password: password.to_string(),
                display_name: display_name.map(String::from),
            },
        );
    }

    pub async fn contains(&self, user_id: Uuid) -> bool {
        self.accounts
            .read()
            .await
            .values()
            .any(|account| account.user_id == user_id)
    }
}

#[async_trait]
impl IdentityGateway for InMemoryIdentityGateway {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Uuid, IdentityError> {
        if password.len() < 6 {
            return Err(IdentityError::WeakCredential);
        }

        let key = email.to_lowercase();
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(IdentityError::DuplicateEmail);
        }

        let user_id = Uuid::new_v4();
        accounts.insert(
            key,
            Account {
                user_id,
                password: password.to_string(),
                display_name: display_name.map(String::from),
            },
        );
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser, IdentityError> {
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(&email.to_lowercase())
            .ok_or(IdentityError::InvalidCredential)?;

        if account.password != password {
            return Err(IdentityError::InvalidCredential);
        }

        Ok(SignedInUser {
            user_id: account.user_id,
            email: email.to_lowercase(),
            display_name: account.display_name.clone(),
        })
    }

    async fn sign_out(&self, _user_id: Uuid) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn delete_identity(&self, user_id: Uuid) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.write().await;
        let key = accounts
            .iter()
            .find(|(_, account)| account.user_id == user_id)
            .map(|(email, _)| email.clone());

        match key {
            Some(key) => {
                accounts.remove(&key);
                Ok(())
            }
            None => Err(IdentityError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let gateway = InMemoryIdentityGateway::new();
        gateway
            .sign_up("alice@example.com", "secret1", Some("Alice"))
            .await
            .unwrap();

        let err = gateway
            .sign_up("Alice@Example.com", "secret2", None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::DuplicateEmail));
    }

    #[tokio::test]
    async fn short_password_is_weak() {
        let gateway = InMemoryIdentityGateway::new();
        let err = gateway
            .sign_up("bob@example.com", "12345", None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::WeakCredential));
    }

    #[tokio::test]
    async fn sign_in_checks_password() {
        let gateway = InMemoryIdentityGateway::new();
        let user_id = gateway
            .sign_up("carol@example.com", "secret1", None)
            .await
            .unwrap();

        let signed_in = gateway
            .sign_in("carol@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(signed_in.user_id, user_id);

        let err = gateway
            .sign_in("carol@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredential));
    }

    #[tokio::test]
    async fn delete_missing_identity_is_not_found() {
        let gateway = InMemoryIdentityGateway::new();
        let err = gateway.delete_identity(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, IdentityError::NotFound));
    }
}
