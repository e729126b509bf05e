use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::entities::companies;

#[derive(Debug, Clone, Serialize)]
pub struct Company {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<companies::Model> for Company {
    fn from(model: companies::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            website: model.website,
            industry: model.industry,
            address: model.address,
            phone_number: model.phone_number,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyInput {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

pub struct CompanyRepository {
    conn: DatabaseConnection,
}

impl CompanyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// List all companies belonging to `user_id`, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Company>> {
        let models = companies::Entity::find()
            .filter(companies::Column::UserId.eq(user_id))
            .order_by_desc(companies::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list companies")?;

        Ok(models.into_iter().map(Company::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Company>> {
        let model = companies::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query company")?;

        Ok(model.map(Company::from))
    }

    pub async fn create(&self, user_id: i64, input: CompanyInput) -> Result<Company> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = companies::ActiveModel {
            user_id: Set(user_id),
            name: Set(input.name),
            website: Set(input.website),
            industry: Set(input.industry),
            address: Set(input.address),
            phone_number: Set(input.phone_number),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert company")?;

        Ok(Company::from(model))
    }

    pub async fn update(&self, id: i64, input: CompanyInput) -> Result<Option<Company>> {
        let Some(model) = companies::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query company for update")?
        else {
            return Ok(None);
        };

        let mut active: companies::ActiveModel = model.into();
        active.name = Set(input.name);
        active.website = Set(input.website);
        active.industry = Set(input.industry);
        active.address = Set(input.address);
        active.phone_number = Set(input.phone_number);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update company")?;

        Ok(Some(Company::from(updated)))
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = companies::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete company")?;

        Ok(result.rows_affected > 0)
    }
}
