use crate::throttle::Throttle;
use futures::channel::mpsc::Sender;
use futures::io::{AsyncRead, AsyncSeek, SeekFrom};
use pin_project_lite::pin_project;
use std::io::Result as IoResult;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Source of "now" for throttling decisions. Swappable so tests can drive
/// time by hand instead of sleeping.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Instant::now)
}

/// Integer percentage of `done` out of `total`, floored and capped at 100.
/// An empty payload counts as complete.
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (u128::from(done) * 100) / u128::from(total);
    // Infallible: clamped to 100 before narrowing.
    u8::try_from(percent.min(100)).unwrap_or(100)
}

pin_project! {
    /// Counts bytes read through it and posts a throttled percentage into a
    /// mailbox.
    ///
    /// Posting uses [`try_send`](Sender::try_send): if the receiver is slow
    /// (mailbox full) or gone, the update is dropped and the read carries on.
    /// The reader is never made to wait for whoever renders the progress.
    ///
    /// Seeking is passed straight through to the inner reader and moves the
    /// counter to the new position, so a rewound buffer can be sent again
    /// and report sensible percentages on the second attempt.
    ///
    /// ```
    /// use drivebot_asyncutils::ProgressTracker;
    /// use futures::io::{AsyncReadExt, Cursor};
    /// use std::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let (mailbox, _updates) = futures::channel::mpsc::channel(4);
    /// let data = vec![0u8; 1024];
    /// let mut tracker = ProgressTracker::new(Cursor::new(data), 1024, Duration::from_secs(4), mailbox);
    /// let mut sink = Vec::new();
    /// tracker.read_to_end(&mut sink).await.unwrap();
    /// assert_eq!(tracker.bytes_read(), 1024);
    /// # }
    /// ```
    pub struct ProgressTracker<R> {
        #[pin]
        inner: R,
        total: u64,
        read: u64,
        throttle: Throttle,
        clock: Clock,
        mailbox: Sender<u8>,
    }
}

impl<R> ProgressTracker<R> {
    pub fn new(inner: R, total: u64, interval: Duration, mailbox: Sender<u8>) -> Self {
        Self::with_clock(inner, total, interval, mailbox, system_clock())
    }

    pub fn with_clock(inner: R, total: u64, interval: Duration, mailbox: Sender<u8>, clock: Clock) -> Self {
        let throttle = Throttle::new(interval, clock());
        Self {
            inner,
            total,
            read: 0,
            throttle,
            clock,
            mailbox,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead> AsyncRead for ProgressTracker<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<IoResult<usize>> {
        let this = self.project();
        let read = futures::ready!(this.inner.poll_read(cx, buf))?;
        if read > 0 {
            *this.read = this.read.saturating_add(read as u64);
            if this.throttle.ready((this.clock)()) {
                // Fire-and-forget: a full or closed mailbox just loses this update.
                let _ = this.mailbox.try_send(percent_of(*this.read, *this.total));
            }
        }
        Poll::Ready(Ok(read))
    }
}

impl<R: AsyncSeek> AsyncSeek for ProgressTracker<R> {
    fn poll_seek(self: Pin<&mut Self>, cx: &mut Context<'_>, pos: SeekFrom) -> Poll<IoResult<u64>> {
        let this = self.project();
        let position = futures::ready!(this.inner.poll_seek(cx, pos))?;
        *this.read = position;
        Poll::Ready(Ok(position))
    }
}
