//! Unified error taxonomy for the Comradarr control plane (`spec.md` §7).

use thiserror::Error;

use crate::store::StoreError;

/// Category of an upstream HTTP fault, with its retry eligibility
/// (`spec.md` §4.B table, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    Network,
    Authentication,
    RateLimit,
    Server,
    Timeout,
    Validation,
    NotFound,
    Ssl,
}

impl UpstreamErrorKind {
    #[must_use]
    pub const fn retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::Server | Self::Timeout | Self::Network)
    }
}

/// An upstream connector call failed, tagged with its taxonomy category.
#[derive(Debug, Error, Clone)]
#[error("{kind:?}: {message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,
    /// HTTP status code, when the fault came from a response rather than a
    /// transport-level failure.
    pub status: Option<u16>,
    /// `Retry-After` header value in seconds, present only for `RateLimit`.
    pub retry_after_seconds: Option<u64>,
}

impl UpstreamError {
    #[must_use]
    pub fn new(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            retry_after_seconds: None,
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub const fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub const fn retryable(&self) -> bool {
        self.kind.retryable()
    }
}

/// Top-level error type for the control plane.
///
/// Domain faults inside the core are either `Storage` (adapter-level,
/// propagates up and aborts the current tick per `spec.md` §7) or `Invariant`
/// (a programmer error; these are constructed only at sites that would
/// otherwise panic, so call sites can log and abort a tick instead of
/// unwinding the process).
#[derive(Debug, Error)]
pub enum ComradarrError {
    /// A single upstream connector call failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The persistence adapter rejected or failed an operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The persistence adapter failed (connection loss, constraint violation, etc.).
    #[error("storage failure: {0}")]
    Storage(String),

    /// An invariant the state machine relies on was violated.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// The requested connector, registry row, or profile does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A paginated response's records all failed schema validation
    /// (`spec.md` §7 "If every record in a non-empty response fails...").
    #[error("schema mismatch: every record in a non-empty page failed validation")]
    SchemaMismatch,

    /// Unknown/opaque error, used sparingly.
    #[error("{0}")]
    Other(String),
}

impl ComradarrError {
    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    #[must_use]
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    #[must_use]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
