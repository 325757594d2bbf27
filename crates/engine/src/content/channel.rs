//! A bounded byte pipe between a push-style body producer and the body bridge.
//!
//! The producer owns a [`ByteWriteChannel`] and pushes chunks into it, the bridge
//! drains the matching [`ByteReadChannel`]. A producer failure is delivered through
//! the pipe as an error item, so the reading side never mistakes it for the end of
//! the body.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, Stream, StreamExt};
use tokio::io::AsyncWrite;

/// Creates a pipe holding at most `capacity` chunks in flight.
pub fn byte_channel(capacity: usize) -> (ByteWriteChannel, ByteReadChannel) {
    let (sender, receiver) = mpsc::channel(capacity);
    (ByteWriteChannel { sender }, ByteReadChannel { receiver })
}

#[derive(Debug, Clone)]
pub struct ByteWriteChannel {
    sender: mpsc::Sender<io::Result<Bytes>>,
}

impl ByteWriteChannel {
    /// Pushes a chunk, waiting while the pipe is full.
    ///
    /// Fails with [`io::ErrorKind::BrokenPipe`] once the reading side is gone.
    pub async fn write(&mut self, bytes: impl Into<Bytes>) -> io::Result<()> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Ok(());
        }
        self.sender.send(Ok(bytes)).await.map_err(|_| broken_pipe())
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write(Bytes::copy_from_slice(buf)).await
    }

    /// Closes the pipe with `error`, which the reading side receives after every
    /// chunk written before it.
    pub async fn fail(&mut self, error: io::Error) {
        // the reader may already be gone, in which case nobody is left to tell
        let _ = self.sender.send(Err(error)).await;
        self.sender.close_channel();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl AsyncWrite for ByteWriteChannel {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.sender.poll_ready(cx)).map_err(|_| broken_pipe())?;
        this.sender.start_send(Ok(Bytes::copy_from_slice(buf))).map_err(|_| broken_pipe())?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().sender.close_channel();
        Poll::Ready(Ok(()))
    }
}

#[derive(Debug)]
pub struct ByteReadChannel {
    receiver: mpsc::Receiver<io::Result<Bytes>>,
}

impl ByteReadChannel {
    /// Returns the next chunk, `None` once every writer has been dropped or closed.
    pub async fn read(&mut self) -> Option<io::Result<Bytes>> {
        self.receiver.next().await
    }
}

impl Stream for ByteReadChannel {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_next_unpin(cx)
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "byte channel reader has been dropped")
}
