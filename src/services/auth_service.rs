//! Domain service for authentication and account provisioning.
//!
//! Handles registration, password login, federated identity provisioning,
//! and the lookup behind the session middleware.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::services::oidc::IdentityClaims;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User account is not active")]
    AccountInactive,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Registration payload after handler-level decoding.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// A freshly-issued session: the signed token plus the account it is for.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a new account with a locally-hashed credential and issues a
    /// session token, so registration doubles as login.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] when the username or email is taken
    /// and [`AuthError::Validation`] on malformed input.
    async fn register(&self, registration: Registration) -> Result<AuthSession, AuthError>;

    /// Verifies credentials and issues a session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if verification fails and
    /// [`AuthError::AccountInactive`] for disabled accounts.
    async fn login(&self, username: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Resolves verified federated identity claims to a local account,
    /// provisioning one on first login, and issues a session token.
    async fn federated_login(&self, claims: &IdentityClaims) -> Result<AuthSession, AuthError>;

    /// Looks up the account behind an authenticated request.
    async fn current_user(&self, user_id: i64) -> Result<User, AuthError>;
}
