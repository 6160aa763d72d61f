//! Async reader adapters used by the transfer pipeline.
//!
//! - [`Throttle`] gates an event to at most once per interval.
//! - [`ProgressTracker`] wraps an [`AsyncRead`](futures::io::AsyncRead),
//!   counts the bytes passing through it and posts a throttled percentage
//!   into a mailbox without ever waiting on the receiver.
//! - [`into_chunks`] turns any reader into a stream of owned byte chunks,
//!   which is what HTTP clients want for streamed request bodies.

mod chunks;
mod progress;
mod throttle;

pub use crate::chunks::into_chunks;
pub use crate::progress::{Clock, ProgressTracker, percent_of, system_clock};
pub use crate::throttle::Throttle;
