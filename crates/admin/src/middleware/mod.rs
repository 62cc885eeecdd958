//! HTTP middleware stack for the console.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with in-memory store)
//! 4. Navigation guard (session restore and route access check)

pub mod auth;
pub mod guard;
pub mod session;

pub use auth::CurrentSession;
pub use guard::{ConsoleSession, navigation_guard};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
