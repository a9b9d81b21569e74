//! Error types for the host-path provisioner
//!
//! Provides structured error types for template resolution, the volume
//! lifecycle engine, the storage-class collaborator and startup configuration.

use crate::domain::ports::ProvisioningState;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Path Template Errors
    // =========================================================================
    #[error("Template {template} references unknown variable: {variable}")]
    UnresolvedVariable { template: String, variable: String },

    #[error("Resolved volume path is empty, template: {template}")]
    EmptyPath { template: String },

    #[error("Resolved volume path {path} escapes the storage root")]
    PathEscapesRoot { path: String },

    #[error("Resolved volume path {path} is inside the reserved {reserved} directory")]
    ReservedPath { path: String, reserved: String },

    // =========================================================================
    // Provisioning Errors
    // =========================================================================
    #[error("Claim selector is not supported: {claim}")]
    SelectorNotSupported { claim: String },

    #[error("Invalid provision request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Storage class lookup failed for {object}: {reason}")]
    StorageClassLookup { object: String, reason: String },

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Metrics registration error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("Failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O failure with the operation and path it happened on
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient errors - retry with backoff
            Error::Kube(_) => ErrorAction::RequeueWithBackoff,

            // Collaborator failures - the class may appear later
            Error::StorageClassLookup { .. } | Error::ResourceNotFound { .. } => {
                ErrorAction::RequeueAfter(Duration::from_secs(30))
            }

            // Filesystem failures - leave the record alone and try again later
            Error::Io { .. } => ErrorAction::RequeueAfter(Duration::from_secs(60)),

            // Configuration/validation errors - a bad template never self-heals
            Error::Configuration(_)
            | Error::UnresolvedVariable { .. }
            | Error::EmptyPath { .. }
            | Error::PathEscapesRoot { .. }
            | Error::ReservedPath { .. }
            | Error::SelectorNotSupported { .. }
            | Error::InvalidRequest(_)
            | Error::YamlParse(_) => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Provisioning state reported alongside this error.
    ///
    /// The engine never leaves work running in the background, so every
    /// failed attempt is finished from the runtime's point of view.
    pub fn provisioning_state(&self) -> ProvisioningState {
        ProvisioningState::Finished
    }
}

/// Result type alias for the provisioner
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_actions() {
        let err = Error::EmptyPath {
            template: "{missing}".into(),
        };
        assert_eq!(err.action(), ErrorAction::NoRequeue);

        let err = Error::io(
            "create directory",
            "/persistentvolumes/a",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(
            err.action(),
            ErrorAction::RequeueAfter(Duration::from_secs(60))
        );

        let err = Error::StorageClassLookup {
            object: "pvc-1".into(),
            reason: "volume has no storage class".into(),
        };
        assert_eq!(
            err.action(),
            ErrorAction::RequeueAfter(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_error_retryable() {
        let config_err = Error::SelectorNotSupported {
            claim: "ns/claim".into(),
        };
        assert!(!config_err.is_retryable());
        assert_eq!(config_err.provisioning_state(), ProvisioningState::Finished);

        let io_err = Error::io(
            "rename",
            "/persistentvolumes/a",
            std::io::Error::from(std::io::ErrorKind::Other),
        );
        assert!(io_err.is_retryable());
    }

    #[test]
    fn test_io_error_message_names_path() {
        let err = Error::io(
            "remove",
            "/persistentvolumes/ns-a",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to remove /persistentvolumes/ns-a"));
    }
}
