//! Provider Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A provider error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No usable credential; every provider operation degrades to this.
    #[display("provider unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// The credential exists but could not be parsed or exchanged for a token.
    #[display("invalid credential: {_0}")]
    Credential(#[error(not(source))] String),
    /// The requested file or folder does not exist (or is not visible).
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The provider answered with an error status.
    #[display("{message} (HTTP {status})")]
    Api {
        status: u16,
        #[error(not(source))]
        message: String,
    },
    /// Connection, timeout or transport-level failure.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The provider answered with something that could not be decoded.
    #[display("invalid response: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn error_kind_display() {
        let kind = ErrorKind::Api {
            status: 404,
            message: "File not found: abc.".to_string(),
        };
        assert_eq!(kind.to_string(), "File not found: abc. (HTTP 404)");
        assert_eq!(
            ErrorKind::Unavailable("no credentials".to_string()).to_string(),
            "provider unavailable: no credentials"
        );
    }

    #[rstest]
    #[case(ErrorKind::Network("reset".to_string()), true)]
    #[case(ErrorKind::Api { status: 503, message: String::new() }, true)]
    #[case(ErrorKind::Api { status: 429, message: String::new() }, true)]
    #[case(ErrorKind::Api { status: 403, message: String::new() }, false)]
    #[case(ErrorKind::NotFound("x".to_string()), false)]
    #[case(ErrorKind::Unavailable("x".to_string()), false)]
    fn error_kind_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }
}
