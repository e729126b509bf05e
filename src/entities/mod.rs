pub mod prelude;

pub mod companies;
pub mod contacts;
pub mod id_tokens;
pub mod users;
