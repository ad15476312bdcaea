//! Error types for keel-kube

use keel_core::CoreError;
use thiserror::Error;

/// Result type for keel-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur during handler operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Decoding, conversion, type or input-shape failure before any request
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The control plane already holds an object with this name
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },

    /// The control plane holds no object with this name
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// The request context was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// The request context deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Any other failure reported by the control plane
    #[error("Kubernetes API error: {0}")]
    ControlPlane(#[from] kube::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if the control plane reported an existing object (create conflict)
    pub fn is_already_exists(&self) -> bool {
        matches!(self, KubeError::AlreadyExists { .. })
    }

    /// Check if the control plane reported a missing object
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::NotFound { .. })
    }

    /// Check if the request was cancelled or ran out of time
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KubeError::Cancelled | KubeError::DeadlineExceeded)
    }

    /// HTTP status code of a control-plane rejection, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            KubeError::AlreadyExists { .. } => Some(409),
            KubeError::NotFound { .. } => Some(404),
            KubeError::ControlPlane(kube::Error::Api(resp)) => Some(resp.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    #[test]
    fn test_predicates() {
        let exists = KubeError::AlreadyExists {
            kind: "ConfigMap".to_string(),
            name: "web".to_string(),
        };
        assert!(exists.is_already_exists());
        assert!(!exists.is_not_found());
        assert_eq!(exists.status_code(), Some(409));
        assert_eq!(exists.to_string(), "ConfigMap 'web' already exists");

        assert!(KubeError::Cancelled.is_cancelled());
        assert!(KubeError::DeadlineExceeded.is_cancelled());
    }

    #[test]
    fn test_core_errors_are_transparent() {
        let err: KubeError = CoreError::MissingName {
            kind: "Role".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Role is missing metadata.name");
    }

    #[test]
    fn test_status_code_of_api_error() {
        let err = KubeError::ControlPlane(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code: 403,
        }));
        assert_eq!(err.status_code(), Some(403));
        assert!(!err.is_not_found());
    }
}
