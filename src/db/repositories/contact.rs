use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::entities::contacts;

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: i64,
    pub user_id: i64,
    pub company_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub job_title: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<contacts::Model> for Contact {
    fn from(model: contacts::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            company_id: model.company_id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone_number: model.phone_number,
            job_title: model.job_title,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub struct ContactRepository {
    conn: DatabaseConnection,
}

impl ContactRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// List all contacts belonging to `user_id`, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Contact>> {
        let models = contacts::Entity::find()
            .filter(contacts::Column::UserId.eq(user_id))
            .order_by_desc(contacts::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list contacts")?;

        Ok(models.into_iter().map(Contact::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Contact>> {
        let model = contacts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query contact")?;

        Ok(model.map(Contact::from))
    }

    pub async fn create(&self, user_id: i64, input: ContactInput) -> Result<Contact> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = contacts::ActiveModel {
            user_id: Set(user_id),
            company_id: Set(input.company_id),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            email: Set(input.email),
            phone_number: Set(input.phone_number),
            job_title: Set(input.job_title),
            notes: Set(input.notes),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert contact")?;

        Ok(Contact::from(model))
    }

    pub async fn update(&self, id: i64, input: ContactInput) -> Result<Option<Contact>> {
        let Some(model) = contacts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query contact for update")?
        else {
            return Ok(None);
        };

        let mut active: contacts::ActiveModel = model.into();
        active.company_id = Set(input.company_id);
        active.first_name = Set(input.first_name);
        active.last_name = Set(input.last_name);
        active.email = Set(input.email);
        active.phone_number = Set(input.phone_number);
        active.job_title = Set(input.job_title);
        active.notes = Set(input.notes);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update contact")?;

        Ok(Some(Contact::from(updated)))
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = contacts::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete contact")?;

        Ok(result.rows_affected > 0)
    }
}
