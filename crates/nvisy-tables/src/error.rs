//! Error types for table operations.

use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for all table operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur in table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-supplied input was invalid.
    InvalidInput,
    /// An entity had a missing or malformed partition or row key.
    InvalidEntity,
    /// The table or entity does not exist.
    NotFound,
    /// An entity with the same key already exists.
    Conflict,
    /// An etag precondition did not hold.
    PreconditionFailed,
    /// The provider rejected the request due to rate limiting.
    Throttled,
    /// Network or connection failure.
    Transport,
    /// Any other failure reported by the provider.
    Provider,
    /// Invalid configuration.
    Configuration,
    /// The operation was cancelled before completion.
    Cancelled,
    /// A batch write failed after some of its chunks were committed.
    PartialBatch,
}

/// Position of a failed chunk within a multi-chunk batch write.
///
/// Attached to errors of kind [`ErrorKind::PartialBatch`]. Chunks are
/// not rolled back, so every chunk listed in `committed` stays written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Submission index of the first chunk that failed.
    pub chunk: usize,
    /// Total number of chunks in the write.
    pub chunks: usize,
    /// Submission indices of the chunks that completed successfully.
    pub committed: Vec<usize>,
}

/// A structured error type for table operations.
#[derive(Debug, Error)]
#[error("{kind}{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
    batch: Option<BatchFailure>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            batch: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new invalid entity error.
    pub fn invalid_entity() -> Self {
        Self::new(ErrorKind::InvalidEntity)
    }

    /// Creates a new not found error.
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates a new conflict error.
    pub fn conflict() -> Self {
        Self::new(ErrorKind::Conflict)
    }

    /// Creates a new precondition failed error.
    pub fn precondition_failed() -> Self {
        Self::new(ErrorKind::PreconditionFailed)
    }

    /// Creates a new throttled error.
    pub fn throttled() -> Self {
        Self::new(ErrorKind::Throttled)
    }

    /// Creates a new transport error.
    pub fn transport() -> Self {
        Self::new(ErrorKind::Transport)
    }

    /// Creates a new provider error.
    pub fn provider() -> Self {
        Self::new(ErrorKind::Provider)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new cancelled error.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled)
    }

    /// Wraps a chunk failure into a partial batch error.
    ///
    /// The original provider error is kept as the source.
    pub fn partial_batch(failure: BatchFailure, source: Error) -> Self {
        let message = format!(
            "chunk {} of {} failed, {} committed",
            failure.chunk + 1,
            failure.chunks,
            failure.committed.len()
        );

        Self {
            kind: ErrorKind::PartialBatch,
            message: Some(message),
            source: Some(Box::new(source)),
            batch: Some(failure),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the chunk positions when this is a partial batch error.
    pub fn batch_failure(&self) -> Option<&BatchFailure> {
        self.batch.as_ref()
    }

    /// Returns the kind of the underlying provider error.
    ///
    /// For partial batch errors this is the kind of the failed chunk's
    /// error, otherwise the kind of this error.
    pub fn root_kind(&self) -> ErrorKind {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<Error>())
            .filter(|_| self.kind == ErrorKind::PartialBatch)
            .map_or(self.kind, Error::root_kind)
    }

    /// Returns true if the error is a key conflict.
    pub fn is_conflict(&self) -> bool {
        self.root_kind() == ErrorKind::Conflict
    }

    /// Returns true if the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::invalid_input()
            .with_message("failed to (de)serialize entity properties")
            .with_source(error)
    }
}
