//! Error taxonomy for the taiga-stats core.
//!
//! Every variant is a local validation failure: nothing here is retried and
//! nothing is partially applied. Callers surface the message and abort.

use std::path::PathBuf;

use thiserror::Error;

use crate::status::StatusId;

/// Error category for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Explicit status filter names an id the catalog does not know
    UnknownStatus,
    /// Snapshot file missing or malformed
    SnapshotRead,
    /// Snapshot file could not be written
    SnapshotWrite,
    /// Selection references a status absent from the loaded table
    StatusNotInData,
    /// Ideal pace target layer out of range
    InvalidTargetLayer,
    /// Snapshot file holds a header but no rows
    EmptySeries,
    /// Dependency attribute not configured on the project
    MissingAttribute,
    /// Tag filter matched no items
    EmptySelection,
    /// Other filesystem failures
    Io,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownStatus => "UNKNOWN_STATUS",
            Self::SnapshotRead => "SNAPSHOT_READ",
            Self::SnapshotWrite => "SNAPSHOT_WRITE",
            Self::StatusNotInData => "STATUS_NOT_IN_DATA",
            Self::InvalidTargetLayer => "INVALID_TARGET_LAYER",
            Self::EmptySeries => "EMPTY_SERIES",
            Self::MissingAttribute => "MISSING_ATTRIBUTE",
            Self::EmptySelection => "EMPTY_SELECTION",
            Self::Io => "IO",
        }
    }
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("unknown status id {id}; known ids: {known:?}")]
    UnknownStatus { id: StatusId, known: Vec<StatusId> },

    #[error("failed to read snapshot file {path}: {message}")]
    SnapshotRead {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("failed to write snapshot file {path}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("status id {id} is not present in the snapshot data ({columns} status columns)")]
    StatusNotInData { id: StatusId, columns: usize },

    #[error("target layer {index} is out of range; {layers} layers are selected")]
    InvalidTargetLayer { index: usize, layers: usize },

    #[error("snapshot data contains no rows")]
    EmptySeries,

    #[error("no custom attribute named {name:?} is defined on the project")]
    MissingAttribute { name: String },

    #[error("no items match tag filter {tag}")]
    EmptySelection { tag: String },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StatsError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownStatus { .. } => ErrorCategory::UnknownStatus,
            Self::SnapshotRead { .. } => ErrorCategory::SnapshotRead,
            Self::SnapshotWrite { .. } => ErrorCategory::SnapshotWrite,
            Self::StatusNotInData { .. } => ErrorCategory::StatusNotInData,
            Self::InvalidTargetLayer { .. } => ErrorCategory::InvalidTargetLayer,
            Self::EmptySeries => ErrorCategory::EmptySeries,
            Self::MissingAttribute { .. } => ErrorCategory::MissingAttribute,
            Self::EmptySelection { .. } => ErrorCategory::EmptySelection,
            Self::Io { .. } => ErrorCategory::Io,
        }
    }

    /// Create a snapshot read error for a malformed file
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SnapshotRead {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a snapshot read error with an underlying I/O source
    pub fn snapshot_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SnapshotRead {
            path: path.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, StatsError>;
