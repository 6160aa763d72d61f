use derive_more::Display;

/// Why a transfer ended without delivering anything.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum TransferFailure {
    /// File metadata could not be read.
    #[display("fetch error: {_0}")]
    Fetch(String),
    /// The download could not be started or broke off.
    #[display("init error: {_0}")]
    Init(String),
    /// The sink refused or failed the upload.
    #[display("upload error")]
    Upload { view_link: Option<String> },
}

/// Terminal result of one transfer job.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    #[display("delivered (from cache: {from_cache})")]
    Delivered { from_cache: bool },
    #[display("rejected: {size} bytes")]
    SizeRejected { size: u64, view_link: Option<String> },
    #[display("failed: {_0}")]
    Failed(TransferFailure),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}
