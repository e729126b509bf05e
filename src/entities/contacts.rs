use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "contacts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owner of the contact record.
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
