//! Error types for the navmesh collector.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! the specific failure. Per-candidate problems are recovered locally and
//! reported in the run result; configuration and output failures abort the
//! run and surface here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::entity::EntityKey;
use crate::source::SourceId;

/// Configuration errors, raised before any candidate is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Either interior cells or exterior cells must be enabled")]
    NoContainmentSelected,

    #[error("Invalid source name '{name}': {reason}")]
    InvalidSourceName {
        name: String,
        reason: String,
    },

    #[error("Invalid entity key '{value}': {reason}")]
    InvalidEntityKey {
        value: String,
        reason: String,
    },

    #[error("Invalid settings document: {message}")]
    Settings {
        message: String,
    },

    #[error("Invalid collector config: {reason}")]
    InvalidCollectorConfig {
        reason: String,
    },
}

/// Structural problems with an override chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("override chain is empty")]
    Empty,

    #[error("source {source_id} appears more than once in the override chain")]
    DuplicateSource {
        source_id: SourceId,
    },
}

/// Failure to produce the override chain for one candidate.
///
/// These never abort a run: the candidate is skipped and the error is
/// recorded in the run's failure list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("No override chain found for {key}")]
    NotFound {
        key: EntityKey,
    },

    #[error("Malformed override chain for {key}: {source}")]
    Malformed {
        key: EntityKey,
        #[source]
        source: ChainError,
    },

    #[error("Record resolution failed for {key}: {message}")]
    Backend {
        key: EntityKey,
        message: String,
    },
}

impl ResolutionError {
    /// Returns the key of the candidate that failed.
    #[must_use]
    pub const fn key(&self) -> &EntityKey {
        match self {
            Self::NotFound { key } | Self::Malformed { key, .. } | Self::Backend { key, .. } => key,
        }
    }
}

/// Failures while persisting the collected output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("No permission to write {}: {source}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Output {} is locked by another process: {source}", path.display())]
    Locked {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize output: {message}")]
    Serialization {
        message: String,
    },
}

impl OutputError {
    /// Classifies an I/O failure on `path`.
    #[must_use]
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            io::ErrorKind::WouldBlock => Self::Locked { path, source },
            _ => Self::Io { path, source },
        }
    }
}

/// Top-level error type for the collector.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Output write error: {0}")]
    OutputWrite(#[from] OutputError),

    #[error("A collection run is already in progress")]
    ConcurrentRunRejected,

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl CollectorError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this is an output write error.
    #[must_use]
    pub const fn is_output(&self) -> bool {
        matches!(self, Self::OutputWrite(_))
    }

    /// Returns true if the run was rejected because another run was active.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::ConcurrentRunRejected)
    }

    /// Returns true if the caller may reasonably retry the same request.
    ///
    /// The collector itself never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ConcurrentRunRejected => true,
            Self::OutputWrite(OutputError::Locked { .. }) => true,
            Self::Configuration(_) | Self::OutputWrite(_) | Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for collector operations.
pub type CollectorResult<T> = Result<T, CollectorError>;
