//! Transport Error Types

use derive_more::{Display, Error};

/// A transport error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Connection, timeout or transport-level failure.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The Bot API answered `ok: false`.
    #[display("{description} (code {code})")]
    Api {
        code: u16,
        #[error(not(source))]
        description: String,
    },
    /// The Bot API answered with something that could not be decoded.
    #[display("invalid response: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// The document body could not be read while streaming it out.
    #[display("upload body failed: {_0}")]
    Body(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { code, .. } => *code == 429 || *code >= 500,
            Self::InvalidData(_) | Self::Body(_) => false,
        }
    }

    /// Edits that change nothing are rejected by the Bot API. Callers doing
    /// best-effort status edits treat this as success.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::Api { description, .. } if description.contains("message is not modified"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Network("timeout".to_string()), true)]
    #[case(ErrorKind::Api { code: 429, description: "Too Many Requests".to_string() }, true)]
    #[case(ErrorKind::Api { code: 400, description: "Bad Request".to_string() }, false)]
    #[case(ErrorKind::InvalidData("result"), false)]
    fn error_kind_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn error_kind_not_modified() {
        let kind = ErrorKind::Api {
            code: 400,
            description: "Bad Request: message is not modified: specified new message content and reply markup are exactly the same".to_string(),
        };
        assert!(kind.is_not_modified());
        assert_eq!(
            ErrorKind::Api { code: 403, description: "Forbidden: bot was blocked by the user".to_string() }.to_string(),
            "Forbidden: bot was blocked by the user (code 403)"
        );
    }
}
