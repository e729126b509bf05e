use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::company::{Company, CompanyInput};
pub use repositories::contact::{Contact, ContactInput};
pub use repositories::id_token::TokenStoreError;
pub use repositories::ownership::{OwnedTable, OwnershipError};
pub use repositories::user::{NewUser, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with("sqlite::memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn id_token_repo(&self) -> repositories::id_token::IdTokenRepository {
        repositories::id_token::IdTokenRepository::new(self.conn.clone())
    }

    fn ownership_repo(&self) -> repositories::ownership::OwnershipRepository {
        repositories::ownership::OwnershipRepository::new(self.conn.clone())
    }

    fn contact_repo(&self) -> repositories::contact::ContactRepository {
        repositories::contact::ContactRepository::new(self.conn.clone())
    }

    fn company_repo(&self) -> repositories::company::CompanyRepository {
        repositories::company::CompanyRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo()
            .get_by_username_with_password(username)
            .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        self.user_repo().create(new_user).await
    }

    pub async fn find_or_create_user_by_email(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(User, bool)> {
        self.user_repo()
            .find_or_create_by_email(email, first_name, last_name)
            .await
    }

    // ========== ID token store ==========

    pub async fn put_id_token(
        &self,
        user_id: i64,
        token: &str,
        ttl_secs: i64,
    ) -> Result<(), TokenStoreError> {
        self.id_token_repo().put(user_id, token, ttl_secs).await
    }

    pub async fn get_id_token(&self, user_id: i64) -> Result<String, TokenStoreError> {
        self.id_token_repo().get(user_id).await
    }

    pub async fn delete_id_token(&self, user_id: i64) -> Result<(), TokenStoreError> {
        self.id_token_repo().delete(user_id).await
    }

    // ========== Ownership ==========

    pub async fn validate_ownership(
        &self,
        table: OwnedTable,
        record_id: i64,
        user_id: i64,
    ) -> Result<(), OwnershipError> {
        self.ownership_repo()
            .validate(table, record_id, user_id)
            .await
    }

    // ========== Contacts ==========

    pub async fn list_contacts(&self, user_id: i64) -> Result<Vec<Contact>> {
        self.contact_repo().list_for_user(user_id).await
    }

    pub async fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
        self.contact_repo().get(id).await
    }

    pub async fn create_contact(&self, user_id: i64, input: ContactInput) -> Result<Contact> {
        self.contact_repo().create(user_id, input).await
    }

    pub async fn update_contact(&self, id: i64, input: ContactInput) -> Result<Option<Contact>> {
        self.contact_repo().update(id, input).await
    }

    pub async fn delete_contact(&self, id: i64) -> Result<bool> {
        self.contact_repo().delete(id).await
    }

    // ========== Companies ==========

    pub async fn list_companies(&self, user_id: i64) -> Result<Vec<Company>> {
        self.company_repo().list_for_user(user_id).await
    }

    pub async fn get_company(&self, id: i64) -> Result<Option<Company>> {
        self.company_repo().get(id).await
    }

    pub async fn create_company(&self, user_id: i64, input: CompanyInput) -> Result<Company> {
        self.company_repo().create(user_id, input).await
    }

    pub async fn update_company(&self, id: i64, input: CompanyInput) -> Result<Option<Company>> {
        self.company_repo().update(id, input).await
    }

    pub async fn delete_company(&self, id: i64) -> Result<bool> {
        self.company_repo().delete(id).await
    }
}
