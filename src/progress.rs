//! Transfer progress reporting.
//!
//! The repository reports byte-level progress to a [`TransferProgress`]
//! sink without knowing who listens.  [`ProgressWriter`] wraps the local
//! side of a download.  Uploads run inside the backend, which reports byte
//! counts over a channel that [`relay_progress`] drains into the sink.

use std::future::Future;
use std::io::{self, Write};
use tokio::sync::mpsc;

/// Receives progress for one transfer.
pub trait TransferProgress {
    /// `transferred` bytes just moved; `remaining` bytes still expected
    /// (0 when the total is unknown or reached).
    fn progress(&mut self, transferred: usize, remaining: u64);
}

impl<F: FnMut(usize, u64)> TransferProgress for F {
    fn progress(&mut self, transferred: usize, remaining: u64) {
        self(transferred, remaining)
    }
}

/// A sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl TransferProgress for NoProgress {
    fn progress(&mut self, _transferred: usize, _remaining: u64) {}
}

/// Sending half of an upload's progress channel.  Each message is the
/// number of bytes a backend just handed to the wire.
pub type ProgressSender = mpsc::UnboundedSender<usize>;

/// Drive `transfer` to completion, passing each byte count that arrives on
/// `counts` to `sink` as it comes in.
///
/// `total` is the declared length; counts still queued when the transfer
/// finishes are delivered before returning.
pub async fn relay_progress<F: Future>(
    transfer: F,
    mut counts: mpsc::UnboundedReceiver<usize>,
    sink: &mut dyn TransferProgress,
    total: u64,
) -> F::Output {
    let mut remaining = total;
    let mut report = |n: usize| {
        remaining = remaining.saturating_sub(n as u64);
        sink.progress(n, remaining);
    };

    tokio::pin!(transfer);
    let output = loop {
        tokio::select! {
            biased;
            Some(n) = counts.recv() => report(n),
            output = &mut transfer => break output,
        }
    };
    while let Ok(n) = counts.try_recv() {
        report(n);
    }
    output
}

/// Writer reporting every successful write.
pub struct ProgressWriter<'p, W> {
    inner: W,
    sink: &'p mut dyn TransferProgress,
    remaining: u64,
    transferred: u64,
}

impl<'p, W: Write> ProgressWriter<'p, W> {
    /// `total` is the expected length, if the other side announced one.
    pub fn new(inner: W, sink: &'p mut dyn TransferProgress, total: Option<u64>) -> Self {
        Self {
            inner,
            sink,
            remaining: total.unwrap_or(0),
            transferred: 0,
        }
    }

    /// Bytes written so far.
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ProgressWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if n > 0 {
            self.transferred += n as u64;
            self.remaining = self.remaining.saturating_sub(n as u64);
            self.sink.progress(n, self.remaining);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
