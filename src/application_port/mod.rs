mod auth_service;
mod credential_hasher;

pub use auth_service::*;
pub use credential_hasher::*;
