pub use super::companies::Entity as Companies;
pub use super::contacts::Entity as Contacts;
pub use super::id_tokens::Entity as IdTokens;
pub use super::users::Entity as Users;
