use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users;

/// Directory-provisioned accounts carry a placeholder instead of a real
/// credential; password login for them always fails verification.
pub const FEDERATED_PASSWORD_PLACEHOLDER: &str = "oidc_login_placeholder";

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            role: model.role,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fields required to create a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub status: String,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by username with password hash (for login verification)
    pub async fn get_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    /// Get user by email
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Insert a new account. Fails on username/email collisions with the
    /// underlying unique-constraint error.
    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            role: Set(new_user.role),
            status: Set(new_user.status),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    /// Look up an account by email, provisioning one when absent.
    ///
    /// Two callers racing on the same fresh email may both miss the lookup;
    /// the loser's insert hits the unique constraint, in which case the
    /// winner's row is re-fetched and returned. Returns `(user, created)`.
    pub async fn find_or_create_by_email(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(User, bool)> {
        if let Some(existing) = self.get_by_email(email).await? {
            return Ok((existing, false));
        }

        let username = email.split('@').next().unwrap_or(email).to_string();
        let new_user = NewUser {
            username,
            email: email.to_string(),
            password_hash: FEDERATED_PASSWORD_PLACEHOLDER.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role: "employee".to_string(),
            status: "active".to_string(),
        };

        match self.create(new_user).await {
            Ok(user) => Ok((user, true)),
            Err(e) if is_unique_violation(&e) => {
                let user = self
                    .get_by_email(email)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("User vanished after unique violation: {email}"))?;
                Ok((user, false))
            }
            Err(e) => Err(e),
        }
    }
}

/// Detect a unique-constraint failure anywhere in the error chain.
fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.to_string().contains("UNIQUE constraint failed"))
}

/// Hash a password using Argon2id with optional custom params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Hash on a blocking thread; Argon2 is CPU-intensive and would stall the
/// async runtime if run inline.
pub async fn hash_password_blocking(
    password: &str,
    config: Option<&SecurityConfig>,
) -> Result<String> {
    let password = password.to_string();
    let config = config.cloned();
    task::spawn_blocking(move || hash_password(&password, config.as_ref()))
        .await
        .context("Password hashing task panicked")?
}

/// Verify a candidate against a stored hash on a blocking thread.
///
/// A hash that does not parse (including the federated-login placeholder)
/// verifies as `false` rather than erroring out.
pub async fn verify_password_blocking(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();

    task::spawn_blocking(move || {
        let Ok(parsed_hash) = PasswordHash::new(&password_hash) else {
            return Ok(false);
        };

        let argon2 = Argon2::default();
        Ok::<bool, anyhow::Error>(
            argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

/// Split a display name into whitespace fields: first field is the first
/// name, the rest rejoined with single spaces as the last name. "Ada
/// Lovelace" -> ("Ada", "Lovelace"); a single token becomes the first
/// name with an empty last name.
#[must_use]
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut fields = full_name.split_whitespace();
    let Some(first) = fields.next() else {
        return (String::new(), String::new());
    };
    let last = fields.collect::<Vec<_>>().join(" ");
    (first.to_string(), last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_full_name() {
        assert_eq!(
            split_full_name("Ada Lovelace"),
            ("Ada".to_string(), "Lovelace".to_string())
        );
        assert_eq!(split_full_name("Prince"), ("Prince".to_string(), String::new()));
        assert_eq!(
            split_full_name("Anna Maria Alberghetti"),
            ("Anna".to_string(), "Maria Alberghetti".to_string())
        );
        // Leading/trailing/interior runs of whitespace collapse
        assert_eq!(
            split_full_name("  Ada Lovelace"),
            ("Ada".to_string(), "Lovelace".to_string())
        );
        assert_eq!(
            split_full_name("Ada\tLovelace"),
            ("Ada".to_string(), "Lovelace".to_string())
        );
        assert_eq!(
            split_full_name("Anna   Maria  Alberghetti "),
            ("Anna".to_string(), "Maria Alberghetti".to_string())
        );
        assert_eq!(split_full_name("   "), (String::new(), String::new()));
    }

    #[tokio::test]
    async fn test_verify_rejects_placeholder_hash() {
        let ok = verify_password_blocking("anything", FEDERATED_PASSWORD_PLACEHOLDER)
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_hash_and_verify_roundtrip() {
        let cfg = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..Default::default()
        };
        let hash = hash_password_blocking("correct horse", Some(&cfg)).await.unwrap();

        assert!(verify_password_blocking("correct horse", &hash).await.unwrap());
        assert!(!verify_password_blocking("wrong horse", &hash).await.unwrap());
    }
}
