//! Binary Error Types

use derive_more::{Display, Error};

/// A bot error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for bot operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration could not be loaded")]
    Config,
    #[display("message templates failed to compile")]
    Templates,
    /// Building the Bot API client failed.
    #[display("messaging transport could not be created")]
    Client,
    /// A Bot API call made while handling an update failed.
    #[display("messaging transport request failed")]
    Transport,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport)
    }
}
