//! Error types for AquaSeal bridge operations.
//!
//! Every failure a caller can observe falls into one of three classes:
//! validation errors raised before any work is queued, errors reported by the
//! media engine itself, and runtime errors caught at the dispatcher boundary.
//! Storage exhaustion and configuration problems are environment faults.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error category for programmatic handling by hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required argument was missing or the call was malformed.
    Validation,
    /// The engine answered with an `error` field.
    Engine,
    /// The engine call faulted or returned garbage.
    Runtime,
    /// No writable directory could be supplied.
    Storage,
    /// Configuration could not be loaded or saved.
    Configuration,
}

/// Errors that can occur in AquaSeal core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument was missing, empty, or unknown.
    #[error("{message}")]
    Validation {
        /// Operation the call was addressed to.
        operation: String,
        /// Human-readable rejection message.
        message: String,
    },

    /// The engine reported a failure in its own response.
    #[error("{message}")]
    Engine {
        /// Operation that failed.
        operation: String,
        /// Message taken verbatim from the engine's `error` field.
        message: String,
    },

    /// The engine call could not be completed (launch failure, crash, bad JSON).
    #[error("{message}")]
    OperationFailed {
        /// Operation that failed.
        operation: String,
        /// Prefixed failure message.
        message: String,
    },

    /// Every directory candidate was exhausted.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The dispatcher worker is gone and can no longer accept requests.
    #[error("Dispatcher is no longer running")]
    DispatcherClosed,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// File system operation failed.
    #[error("File system error at {path}: {message}")]
    FileSystem {
        /// Path where the error occurred.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error for an operation.
    pub fn validation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Get the category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Engine { .. } => ErrorKind::Engine,
            Self::OperationFailed { .. } | Self::DispatcherClosed => ErrorKind::Runtime,
            Self::StorageUnavailable(_) | Self::FileSystem { .. } | Self::Io(_) => {
                ErrorKind::Storage
            }
            Self::Configuration(_) | Self::Serialization(_) => ErrorKind::Configuration,
        }
    }

    /// Whether this error was raised before any work reached the dispatcher.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Errors raised by a media engine while servicing a single call.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine process could not be started.
    #[error("failed to launch engine `{program}`: {source}")]
    Launch {
        /// Program that was launched.
        program: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The engine process exited unsuccessfully.
    #[error("engine exited with {status}: {stderr}")]
    Exited {
        /// Exit status description.
        status: String,
        /// Last meaningful line written to stderr.
        stderr: String,
    },

    /// The engine produced output that is not valid UTF-8.
    #[error("engine output is not valid UTF-8")]
    InvalidOutput,

    /// Failure raised by a [`MediaEngine`](crate::engine::MediaEngine)
    /// implementation that does not run a separate process, such as an
    /// embedded interpreter that has not started.
    #[error("{0}")]
    Other(String),
}
