//! Delivering one file from the provider to a chat.

mod engine;
mod outcome;
mod sink;
mod state;

pub use self::engine::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PROGRESS_INTERVAL, TransferEngine, TransferSettings,
};
pub use self::outcome::{DeliveryOutcome, TransferFailure};
pub use self::sink::{DeliverySink, SinkHandle, Upload, UploadBody};
pub use self::state::{TransferJob, TransferState};
