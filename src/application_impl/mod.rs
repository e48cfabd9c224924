mod auth_config;
mod auth_service_impl;
mod clock_impl;
mod credential_hasher_argon2;
mod refresh_coordinator;
mod revocation_manager;
mod session_store_timeout;
mod session_validator;
mod token_codec_jwt;
mod token_issuer;

pub use auth_config::*;
pub use auth_service_impl::*;
pub use clock_impl::*;
pub use credential_hasher_argon2::*;
pub use refresh_coordinator::*;
pub use revocation_manager::*;
pub use session_store_timeout::*;
pub use session_validator::*;
pub use token_codec_jwt::*;
pub use token_issuer::*;
