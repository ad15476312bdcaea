//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use keel_core::CoreError;
use keel_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Input could not be decoded or does not match the requested kind
    #[error("Invalid input: {message}")]
    #[diagnostic(code(keel::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Unknown `--kind` value
    #[error("Unknown kind '{kind}'")]
    #[diagnostic(code(keel::cli::usage), help("Run `keel kinds` to list supported kinds"))]
    UnknownKind { kind: String },

    /// The named object does not exist
    #[error("{message}")]
    #[diagnostic(
        code(keel::cli::not_found),
        help("Check the namespace with --namespace")
    )]
    NotFound { message: String },

    /// The object already exists
    #[error("{message}")]
    #[diagnostic(
        code(keel::cli::conflict),
        help("Use `keel apply` to update existing objects")
    )]
    Conflict { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(keel::cli::io))]
    Io { message: String },

    /// Invalid configuration file
    #[error("Configuration error: {message}")]
    #[diagnostic(code(keel::cli::config))]
    Config { message: String },

    /// The API server rejected the request
    #[error("{message}")]
    #[diagnostic(code(keel::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Request deadline passed
    #[error("Operation timed out")]
    #[diagnostic(code(keel::cli::timeout), help("Raise the limit with --timeout"))]
    Timeout,

    /// Request cancelled
    #[error("Operation cancelled")]
    #[diagnostic(code(keel::cli::interrupted))]
    Interrupted,

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(keel::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::UnknownKind { .. } => exit_codes::USAGE_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Conflict { .. } => exit_codes::CONFLICT,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Timeout => exit_codes::TIMEOUT,
            CliError::Interrupted => exit_codes::INTERRUPTED,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownKind { kind: kind.into() }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io { .. } => CliError::Io {
                message: err.to_string(),
            },
            CoreError::TypeMismatch { ref expected, .. } => CliError::input_with_help(
                err.to_string(),
                format!("The file must describe a {expected}; check --kind"),
            ),
            CoreError::UnsupportedInputType { .. } => CliError::internal(err.to_string()),
            _ => CliError::input(err.to_string()),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Core(core) => core.into(),
            KubeError::NotFound { .. } => CliError::NotFound {
                message: err.to_string(),
            },
            KubeError::AlreadyExists { .. } => CliError::Conflict {
                message: err.to_string(),
            },
            KubeError::Cancelled => CliError::Interrupted,
            KubeError::DeadlineExceeded => CliError::Timeout,
            KubeError::InvalidConfig(message) => CliError::Config { message },
            KubeError::Io(io) => io.into(),
            KubeError::ControlPlane(ref api) => {
                let help = match err.status_code() {
                    Some(401) | Some(403) => {
                        Some("Check your kubeconfig credentials and RBAC permissions".to_string())
                    }
                    None => Some(
                        "Check that the cluster is reachable with the current kubeconfig"
                            .to_string(),
                    ),
                    _ => None,
                };
                CliError::Cluster {
                    message: api.to_string(),
                    help,
                }
            }
            other => CliError::internal(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
