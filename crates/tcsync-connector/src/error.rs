//! Connector error types
//!
//! One taxonomy shared by the directory side and the target side, with a
//! fatal/per-entity classification the reconciler uses to decide whether a
//! failure aborts the run or is merely recorded.

use thiserror::Error;

/// Error that can occur while talking to the directory or the target server.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Directory errors
    /// The directory connection could not be established or a search could
    /// not be executed.
    #[error("directory unavailable: {message}")]
    DirectoryUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The directory rejected the bind credentials.
    #[error("directory bind failed for {principal}: {message}")]
    AuthError { principal: String, message: String },

    /// A point lookup for a user returned no entry.
    #[error("user not found: {identifier}")]
    UserNotFound { identifier: String },

    /// A lookup for a group returned no entry.
    #[error("group not found: {identifier}")]
    GroupNotFound { identifier: String },

    /// A lookup by unique key returned more than one entry.
    #[error("ambiguous result: {count} entries matched {identifier}")]
    AmbiguousResult { identifier: String, count: usize },

    // Target errors
    /// Transport-level failure talking to the target server.
    #[error("target unavailable: {message}")]
    TargetUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The target returned a body that could not be decoded.
    #[error("failed to decode target response from {endpoint}: {message}")]
    TargetDecodeError { endpoint: String, message: String },

    /// The target refused a create because the entity already exists.
    #[error("create conflict for {identifier}: {body}")]
    CreateConflict { identifier: String, body: String },

    /// The target answered with a non-success status.
    #[error("target rejected {endpoint} with HTTP {status}: {body}")]
    TargetRejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    // Run control
    /// A single call exceeded its deadline.
    #[error("{operation} timed out after {timeout_secs} seconds")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    /// The run was cancelled before the operation completed.
    #[error("operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// Configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl ConnectorError {
    /// Whether this error must abort the whole run.
    ///
    /// Directory-level failures are fatal because no group data can be
    /// obtained without the directory. Everything the target returns is
    /// scoped to a single entity and is recorded instead.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConnectorError::DirectoryUnavailable { .. }
                | ConnectorError::AuthError { .. }
                | ConnectorError::Cancelled { .. }
                | ConnectorError::InvalidConfiguration { .. }
        )
    }

    /// Get an error code for classification in reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::DirectoryUnavailable { .. } => "DIRECTORY_UNAVAILABLE",
            ConnectorError::AuthError { .. } => "AUTH_ERROR",
            ConnectorError::UserNotFound { .. } => "USER_NOT_FOUND",
            ConnectorError::GroupNotFound { .. } => "GROUP_NOT_FOUND",
            ConnectorError::AmbiguousResult { .. } => "AMBIGUOUS_RESULT",
            ConnectorError::TargetUnavailable { .. } => "TARGET_UNAVAILABLE",
            ConnectorError::TargetDecodeError { .. } => "TARGET_DECODE_ERROR",
            ConnectorError::CreateConflict { .. } => "CREATE_CONFLICT",
            ConnectorError::TargetRejected { .. } => "TARGET_REJECTED",
            ConnectorError::Timeout { .. } => "TIMEOUT",
            ConnectorError::Cancelled { .. } => "CANCELLED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
        }
    }

    // Convenience constructors

    /// Create a directory unavailable error.
    pub fn directory_unavailable(message: impl Into<String>) -> Self {
        ConnectorError::DirectoryUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a directory unavailable error with source.
    pub fn directory_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::DirectoryUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a target unavailable error.
    pub fn target_unavailable(message: impl Into<String>) -> Self {
        ConnectorError::TargetUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a target unavailable error with source.
    pub fn target_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::TargetUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        let fatal = vec![
            ConnectorError::directory_unavailable("search failed"),
            ConnectorError::AuthError {
                principal: "svc@corp.example.com".to_string(),
                message: "invalid credentials".to_string(),
            },
            ConnectorError::Cancelled {
                operation: "sync".to_string(),
            },
            ConnectorError::invalid_configuration("missing host"),
        ];

        for err in fatal {
            assert!(err.is_fatal(), "Expected {} to be fatal", err.error_code());
        }
    }

    #[test]
    fn test_per_entity_errors() {
        let per_entity = vec![
            ConnectorError::UserNotFound {
                identifier: "CN=Ghost,DC=corp".to_string(),
            },
            ConnectorError::GroupNotFound {
                identifier: "QA".to_string(),
            },
            ConnectorError::AmbiguousResult {
                identifier: "CN=Twin,DC=corp".to_string(),
                count: 2,
            },
            ConnectorError::target_unavailable("connection reset"),
            ConnectorError::TargetDecodeError {
                endpoint: "/app/rest/users".to_string(),
                message: "expected value".to_string(),
            },
            ConnectorError::CreateConflict {
                identifier: "asmith".to_string(),
                body: "duplicate".to_string(),
            },
            ConnectorError::TargetRejected {
                endpoint: "/app/rest/users".to_string(),
                status: 500,
                body: "boom".to_string(),
            },
            ConnectorError::Timeout {
                operation: "create_user".to_string(),
                timeout_secs: 30,
            },
        ];

        for err in per_entity {
            assert!(
                !err.is_fatal(),
                "Expected {} to be per-entity",
                err.error_code()
            );
        }
    }

    #[test]
    fn test_error_display() {
        let err = ConnectorError::TargetRejected {
            endpoint: "/app/rest/users".to_string(),
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "target rejected /app/rest/users with HTTP 500: Internal Server Error"
        );

        let err = ConnectorError::AmbiguousResult {
            identifier: "(distinguishedName=CN=x)".to_string(),
            count: 3,
        };
        assert_eq!(
            err.to_string(),
            "ambiguous result: 3 entries matched (distinguishedName=CN=x)"
        );
    }

    #[test]
    fn test_error_with_source() {
        let source_err = std::io::Error::new(std::io::ErrorKind::Other, "underlying error");
        let err = ConnectorError::directory_unavailable_with_source("search failed", source_err);

        if let ConnectorError::DirectoryUnavailable { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("Expected DirectoryUnavailable variant");
        }
    }
}
