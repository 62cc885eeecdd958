//! Authentication error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur while logging in or fetching the current profile.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password left blank.
    #[error("username and password are required")]
    MissingCredentials,

    /// The backend refused the request (bad credentials, expired token).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The account exists but may not sign in.
    #[error("account is disabled")]
    AccountDisabled,

    /// The backend answered without a usable profile or token.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// The backend could not be reached or timed out.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend failed while handling the request.
    #[error("server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code returned.
        status: u16,
        /// Body or message returned with it.
        message: String,
    },

    /// The session record could not be written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Whether the failure is on our side of the wire (network, server,
    /// storage) rather than a verdict about the credentials.
    #[must_use]
    pub const fn is_service_failure(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Server { .. } | Self::Storage(_))
    }

    /// Message suitable for showing on the login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredentials => "Please enter both username and password.".to_string(),
            Self::Rejected(message) if !message.is_empty() => message.clone(),
            Self::Rejected(_) => "Invalid username or password.".to_string(),
            Self::AccountDisabled => "This account has been disabled.".to_string(),
            Self::Http(e) if e.is_timeout() => {
                "The server took too long to respond. Please try again.".to_string()
            }
            Self::Http(_) => "Unable to reach the server. Please try again.".to_string(),
            Self::InvalidProfile(_) | Self::Server { .. } | Self::Storage(_) => {
                "The server could not complete the login. Please try again later.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_distinguish_service_failures() {
        let rejected = AuthError::Rejected(String::new());
        assert!(!rejected.is_service_failure());
        assert_eq!(rejected.user_message(), "Invalid username or password.");

        let custom = AuthError::Rejected("Wrong password".to_string());
        assert_eq!(custom.user_message(), "Wrong password");

        let server = AuthError::Server {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(server.is_service_failure());
        assert!(!server.user_message().contains("boom"));
    }

    #[test]
    fn test_display() {
        let err = AuthError::Server {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "server error (HTTP 502): bad gateway");
        assert_eq!(
            AuthError::MissingCredentials.to_string(),
            "username and password are required"
        );
    }
}
