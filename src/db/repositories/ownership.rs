use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use thiserror::Error;

use crate::entities::{companies, contacts};

/// The closed set of tables carrying per-row ownership. Adding a table
/// means adding a variant here; there is no string-named fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnedTable {
    Contacts,
    Companies,
}

impl OwnedTable {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Companies => "companies",
        }
    }
}

#[derive(Debug, Error)]
pub enum OwnershipError {
    /// The row does not exist or belongs to another user. The two cases are
    /// deliberately indistinguishable to the caller.
    #[error("resource not found or not owned")]
    NotOwned,

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct OwnershipRepository {
    conn: DatabaseConnection,
}

impl OwnershipRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Check that `record_id` in `table` belongs to `user_id`.
    pub async fn validate(
        &self,
        table: OwnedTable,
        record_id: i64,
        user_id: i64,
    ) -> Result<(), OwnershipError> {
        let count = match table {
            OwnedTable::Contacts => {
                contacts::Entity::find()
                    .filter(contacts::Column::Id.eq(record_id))
                    .filter(contacts::Column::UserId.eq(user_id))
                    .count(&self.conn)
                    .await?
            }
            OwnedTable::Companies => {
                companies::Entity::find()
                    .filter(companies::Column::Id.eq(record_id))
                    .filter(companies::Column::UserId.eq(user_id))
                    .count(&self.conn)
                    .await?
            }
        };

        if count == 0 {
            return Err(OwnershipError::NotOwned);
        }

        Ok(())
    }
}
