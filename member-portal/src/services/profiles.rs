//! Profile store - single source of truth for authorization decisions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use site_core::error::AppError;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Profile, Role};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, AppError>;

    async fn insert(&self, profile: &Profile) -> Result<(), AppError>;

    /// Set the role. Fails with `NotFound` when no profile row exists;
    /// concurrent writers are last-writer-wins.
    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<(), AppError>;

    /// Profiles with the given role, oldest first, so the pending queue is
    /// served first-come-first-served.
    async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, AppError>;

    /// Remove the profile row. Deleting an absent row is a no-op.
    async fn delete(&self, user_id: Uuid) -> Result<(), AppError>;
}

#[derive(FromRow)]
struct ProfileRow {
    user_id: Uuid,
    email: String,
    display_name: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role).ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "profile {} has unknown role code {:?}",
                row.user_id,
                row.role
            ))
        })?;

        Ok(Profile {
            user_id: row.user_id,
            email: row.email,
            display_name: row.display_name,
            role,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT user_id, email, display_name, role, created_at FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        row.map(Profile::try_from).transpose()
    }

    async fn insert(&self, profile: &Profile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, email, display_name, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(profile.user_id)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(profile.role.as_str())
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE profiles SET role = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "no profile for user {}",
                user_id
            )));
        }
        Ok(())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, AppError> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, email, display_name, role, created_at
            FROM profiles
            WHERE role = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        rows.into_iter().map(Profile::try_from).collect()
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }
}

/// Process-local store, for tests and local runs.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<Uuid, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn insert(&self, profile: &Profile) -> Result<(), AppError> {
        self.profiles
            .write()
            .await
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<(), AppError> {
        match self.profiles.write().await.get_mut(&user_id) {
            Some(profile) => {
                profile.role = role;
                Ok(())
            }
            None => Err(AppError::NotFound(anyhow::anyhow!(
                "no profile for user {}",
                user_id
            ))),
        }
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, AppError> {
        let mut matching: Vec<Profile> = self
            .profiles
            .read()
            .await
            .values()
            .filter(|profile| profile.role == role)
            .cloned()
            .collect();
        matching.sort_by_key(|profile| profile.created_at);
        Ok(matching)
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        self.profiles.write().await.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn pending_queue_is_oldest_first() {
        let store = InMemoryProfileStore::new();
        let now = Utc::now();

        for (email, age_minutes) in [("late@example.com", 1), ("early@example.com", 30)] {
            let mut profile = Profile::new(Uuid::new_v4(), email.to_string(), None);
            profile.created_at = now - Duration::minutes(age_minutes);
            store.insert(&profile).await.unwrap();
        }

        let queue = store.list_by_role(Role::Pending).await.unwrap();
        assert_eq!(queue[0].email, "early@example.com");
        assert_eq!(queue[1].email, "late@example.com");
    }

    #[tokio::test]
    async fn set_role_on_missing_profile_is_not_found() {
        let store = InMemoryProfileStore::new();
        let err = store
            .set_role(Uuid::new_v4(), Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_benign_when_absent() {
        let store = InMemoryProfileStore::new();
        store.delete(Uuid::new_v4()).await.unwrap();
    }
}
