pub mod company;
pub mod contact;
pub mod id_token;
pub mod ownership;
pub mod user;
