pub mod auth;

pub use auth::{AuthUser, AuthVerifier, require_auth};
