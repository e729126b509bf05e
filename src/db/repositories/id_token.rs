use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use thiserror::Error;

use crate::entities::id_tokens;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// TTLs must be strictly positive; zero or negative durations are
    /// rejected instead of being stored as already-expired rows.
    #[error("token TTL must be positive")]
    InvalidExpiry,

    #[error("no token stored for user")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Ephemeral per-user token storage with lazy expiry: rows past their
/// deadline are treated as absent and deleted on the read path.
pub struct IdTokenRepository {
    conn: DatabaseConnection,
}

impl IdTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Store `token` for `user_id`, replacing any previous one. The row
    /// expires `ttl_secs` from now.
    pub async fn put(
        &self,
        user_id: i64,
        token: &str,
        ttl_secs: i64,
    ) -> Result<(), TokenStoreError> {
        if ttl_secs <= 0 {
            return Err(TokenStoreError::InvalidExpiry);
        }

        let expires_at = chrono::Utc::now().timestamp() + ttl_secs;

        let active = id_tokens::ActiveModel {
            user_id: Set(user_id),
            token: Set(token.to_string()),
            expires_at: Set(expires_at),
        };

        // Single-statement upsert keyed on user_id; concurrent writers
        // resolve last-write-wins and readers never observe a gap.
        id_tokens::Entity::insert(active)
            .on_conflict(
                OnConflict::column(id_tokens::Column::UserId)
                    .update_columns([id_tokens::Column::Token, id_tokens::Column::ExpiresAt])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Fetch the stored token for `user_id`. An expired row is removed and
    /// reported as `NotFound`.
    pub async fn get(&self, user_id: i64) -> Result<String, TokenStoreError> {
        let row = id_tokens::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await?
            .ok_or(TokenStoreError::NotFound)?;

        if row.expires_at <= chrono::Utc::now().timestamp() {
            id_tokens::Entity::delete_by_id(user_id)
                .exec(&self.conn)
                .await?;
            return Err(TokenStoreError::NotFound);
        }

        Ok(row.token)
    }

    /// Remove the stored token for `user_id`, if any.
    pub async fn delete(&self, user_id: i64) -> Result<(), TokenStoreError> {
        id_tokens::Entity::delete_by_id(user_id)
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Sweep all expired rows. Called opportunistically; correctness never
    /// depends on it since reads evict lazily.
    pub async fn purge_expired(&self) -> Result<u64, TokenStoreError> {
        let now = chrono::Utc::now().timestamp();
        let result = id_tokens::Entity::delete_many()
            .filter(id_tokens::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
