//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{NewUser, Store, User};
use crate::db::repositories::user::{hash_password_blocking, verify_password_blocking};
use crate::services::auth_service::{AuthError, AuthService, AuthSession, Registration};
use crate::services::oidc::IdentityClaims;
use crate::services::token_service::TokenIssuer;

pub struct SeaOrmAuthService {
    store: Store,
    tokens: Arc<TokenIssuer>,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, tokens: Arc<TokenIssuer>, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }

    fn issue_session(&self, user: User) -> Result<AuthSession, AuthError> {
        let token = self
            .tokens
            .issue(user.id)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(AuthSession { token, user })
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, registration: Registration) -> Result<AuthSession, AuthError> {
        if registration.username.trim().is_empty() || registration.email.trim().is_empty() {
            return Err(AuthError::Validation(
                "Username and email are required".to_string(),
            ));
        }

        if self
            .store
            .get_user_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict("Email already registered".to_string()));
        }

        let password_hash =
            hash_password_blocking(&registration.password, Some(&self.security)).await?;

        let user = self
            .store
            .create_user(NewUser {
                username: registration.username,
                email: registration.email,
                password_hash,
                first_name: registration.first_name,
                last_name: registration.last_name,
                role: "employee".to_string(),
                status: "active".to_string(),
            })
            .await
            .map_err(|e| {
                if e.chain()
                    .any(|c| c.to_string().contains("UNIQUE constraint failed"))
                {
                    AuthError::Conflict("Username or email already taken".to_string())
                } else {
                    AuthError::Database(e.to_string())
                }
            })?;

        info!(user_id = user.id, "Registered new user");
        self.issue_session(user)
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthSession, AuthError> {
        let Some((user, password_hash)) = self
            .store
            .get_user_by_username_with_password(username)
            .await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password, &password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active() {
            return Err(AuthError::AccountInactive);
        }

        self.issue_session(user)
    }

    async fn federated_login(&self, claims: &IdentityClaims) -> Result<AuthSession, AuthError> {
        let email = claims
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::Validation("Identity has no email".to_string()))?;

        let (first_name, last_name) = claims.split_name();

        let (user, created) = self
            .store
            .find_or_create_user_by_email(email, &first_name, &last_name)
            .await?;

        if created {
            info!(user_id = user.id, "Provisioned user from federated login");
        }

        if !user.is_active() {
            return Err(AuthError::AccountInactive);
        }

        self.issue_session(user)
    }

    async fn current_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
