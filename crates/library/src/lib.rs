//! The bot's working parts that sit between the provider and the chat:
//! folder listings in human order, breadcrumbs, name search, and the
//! transfer pipeline with its supervisor.
//!
//! Every component receives its provider and [`SessionStore`] explicitly;
//! none of them know about the messaging platform. Deliveries go through the
//! [`DeliverySink`] trait, which the binary implements for Telegram.
//!
//! [`SessionStore`]: drivebot_cache::SessionStore

mod directory;
pub mod error;
mod path;
mod search;
mod sort;
mod supervisor;
pub mod transfer;

pub use crate::directory::{RemoteDirectory, remember};
pub use crate::path::{MAX_PATH_DEPTH, PATH_SEPARATOR, PathResolver, UNKNOWN_SEGMENT};
pub use crate::search::{SEARCH_LIMIT, SearchIndex};
pub use crate::sort::{NaturalKey, natural_key, sort_entries};
pub use crate::supervisor::{JobReport, ShutdownSummary, TransferSupervisor};
pub use crate::transfer::{DeliveryOutcome, DeliverySink, SinkHandle, TransferEngine, TransferSettings};
