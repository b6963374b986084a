//! Error types for ticket store access and scanner configuration.

use thiserror::Error;

/// Result type alias for ticket store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure talking to the ticket store.
///
/// These are *faults*, not verdicts: a ticket that does not exist is
/// `Ok(None)`, never an error. Faults must never be shown to staff as
/// "invalid ticket".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or refused the request.
    #[error("ticket store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer within the configured timeout.
    #[error("ticket store timed out")]
    Timeout,

    /// A stored row could not be decoded into a ticket.
    #[error("malformed ticket record: {0}")]
    Malformed(String),

    /// More than one record matched an identifier that must be unique.
    #[error("ambiguous ticket identifier: {0}")]
    Ambiguous(String),

    /// The operation was cancelled by the operator before it finished.
    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    ///
    /// Only connectivity faults qualify. Data faults repeat on every read
    /// and a cancelled operation must stay cancelled.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }

    /// Short label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Timeout => "timeout",
            Self::Malformed(_) => "malformed",
            Self::Ambiguous(_) => "ambiguous",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Invalid or missing process configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable was not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable was set but could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value that failed to parse
        value: String,
    },
}
