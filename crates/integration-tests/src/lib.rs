//! Integration tests for the EasyHome console.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p easyhome-integration-tests
//! ```
//!
//! The console runs in-process against the fixture accounts, either driven
//! directly through `tower::ServiceExt::oneshot` or served on an ephemeral
//! port for a cookie-carrying `reqwest` client.

use std::net::SocketAddr;

use axum::Router;
use easyhome_admin::config::AdminConfig;
use easyhome_admin::services::auth::{AuthBackend, FixtureAuthenticator};
use easyhome_admin::state::AppState;

/// The console router with fixture accounts (`root` / `operator`).
#[must_use]
pub fn fixture_app() -> Router {
    easyhome_admin::app(AppState::with_auth(
        AdminConfig::fixture(),
        AuthBackend::Fixture(FixtureAuthenticator::demo()),
    ))
}

/// A console served on a local ephemeral port.
pub struct TestServer {
    addr: SocketAddr,
}

impl TestServer {
    /// Serve [`fixture_app`] in a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn spawn() -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, fixture_app()).await {
                report_server_error(&e);
            }
        });
        Ok(Self { addr })
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// A client that keeps cookies and does not follow redirects.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn client() -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
    }
}

#[allow(clippy::print_stderr)]
fn report_server_error(e: &std::io::Error) {
    eprintln!("test server stopped: {e}");
}

/// The `Location` header of a response, if any.
#[must_use]
pub fn location(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
