//! Services the console talks to: authentication and the EasyHome backend API.

pub mod auth;
pub mod backend;

pub use auth::{AuthBackend, AuthError, AuthSuccess, Authenticator, Credentials};
pub use backend::BackendClient;
