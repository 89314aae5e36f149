//! CLI error types and exit codes

use tcsync_connector::ConnectorError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: Configuration error
/// - 2: Authentication failed
/// - 3: Directory or network error
/// - 4: Validation error
/// - 5: Sync finished with per-entity failures
/// - 130: Interrupted
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Sync completed with {failures} failure(s)")]
    PartialSync { failures: usize },

    #[error("Interrupted: {0}")]
    Cancelled(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 1,
            CliError::AuthenticationFailed(_) => 2,
            CliError::Directory(_) | CliError::Network(_) => 3,
            CliError::Validation(_) => 4,
            CliError::PartialSync { .. } => 5,
            CliError::Cancelled(_) => 130,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::AuthenticationFailed(_) => {
                Some("Check --username/--password (or TCSYNC_USERNAME/TCSYNC_PASSWORD).")
            }
            CliError::Directory(_) => Some("Check --server, --port and the TLS flags."),
            CliError::PartialSync { .. } => Some("See the log above for each failed entity."),
            _ => None,
        }
    }
}

impl From<ConnectorError> for CliError {
    fn from(e: ConnectorError) -> Self {
        match e {
            ConnectorError::InvalidConfiguration { message } => CliError::Config(message),
            ConnectorError::AuthError { .. } => CliError::AuthenticationFailed(e.to_string()),
            ConnectorError::TargetRejected { status, .. } if status == 401 || status == 403 => {
                CliError::AuthenticationFailed(e.to_string())
            }
            ConnectorError::DirectoryUnavailable { .. }
            | ConnectorError::UserNotFound { .. }
            | ConnectorError::GroupNotFound { .. }
            | ConnectorError::AmbiguousResult { .. } => CliError::Directory(e.to_string()),
            ConnectorError::TargetUnavailable { .. }
            | ConnectorError::TargetDecodeError { .. }
            | ConnectorError::TargetRejected { .. }
            | ConnectorError::Timeout { .. } => CliError::Network(e.to_string()),
            ConnectorError::CreateConflict { .. } => CliError::Validation(e.to_string()),
            ConnectorError::Cancelled { operation } => CliError::Cancelled(operation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 1);
        assert_eq!(CliError::AuthenticationFailed("x".into()).exit_code(), 2);
        assert_eq!(CliError::Directory("x".into()).exit_code(), 3);
        assert_eq!(CliError::Network("x".into()).exit_code(), 3);
        assert_eq!(CliError::Validation("x".into()).exit_code(), 4);
        assert_eq!(CliError::PartialSync { failures: 2 }.exit_code(), 5);
    }

    #[test]
    fn test_from_connector_error() {
        let err: CliError = ConnectorError::AuthError {
            principal: "svc@corp.example.com".into(),
            message: "invalid credentials".into(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);

        let err: CliError = ConnectorError::directory_unavailable("connection refused").into();
        assert_eq!(err.exit_code(), 3);

        let err: CliError = ConnectorError::invalid_configuration("host is required").into();
        assert!(matches!(err, CliError::Config(ref m) if m == "host is required"));

        let err: CliError = ConnectorError::TargetRejected {
            endpoint: "/app/rest/userGroups".into(),
            status: 401,
            body: "Authentication required".into(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);

        let err: CliError = ConnectorError::TargetRejected {
            endpoint: "/app/rest/userGroups".into(),
            status: 500,
            body: "boom".into(),
        }
        .into();
        assert_eq!(err.exit_code(), 3);
    }
}
