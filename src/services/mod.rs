pub mod auth_service;
pub mod auth_service_impl;
pub mod oidc;
pub mod token_service;
