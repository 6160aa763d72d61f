//! Library Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Provider failures are wrapped so the original error
//! stays in the tree as a child frame.

use crate::transfer::TransferState;
use derive_more::{Display, Error};
use drivebot_drive::error::{Error as ProviderError, ErrorKind as ProviderErrorKind};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No usable provider credential was configured.
    #[display("source provider unavailable")]
    Unavailable,
    /// The provider rejected or failed a request.
    #[display("source provider request failed")]
    Provider,
    /// The delivery sink rejected or failed a request.
    #[display("delivery sink request failed")]
    Sink,
    /// A transfer job attempted a move its state graph does not allow.
    #[display("invalid transfer transition from {from} to {to}")]
    InvalidTransition { from: TransferState, to: TransferState },
}

impl ErrorKind {
    /// Wraps a provider error, keeping it as the child frame.
    #[track_caller]
    pub fn provider(err: ProviderError) -> Error {
        let kind = match &*err {
            ProviderErrorKind::Unavailable(_) => Self::Unavailable,
            _ => Self::Provider,
        };
        err.raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider | Self::Sink)
    }
}
