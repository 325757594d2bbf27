//! Streams an [`OutgoingContent`] into a transport.
//!
//! The transport side is a [`BodySink`]. Every representation is written through the
//! same three calls: `write` per chunk, then `close` once the body is complete, or
//! `abort` when the transfer failed or was cancelled. Exactly one of `close` and
//! `abort` ends every transfer.

use std::io;

use bytes::Bytes;
use futures::StreamExt;
use tokio::select;
use tokio_util::io::ReaderStream;
use tracing::{debug, trace};

use crate::content::{OutgoingContent, WriteChannelContent, byte_channel};
use crate::protocol::{CallContext, ConfigError, ConnectError, HttpError, SendError};
use crate::utils::AbortOnDrop;

/// Chunks a push-style producer may have in flight before it has to wait.
const WRITE_CHANNEL_CAPACITY: usize = 8;

/// Read buffer size for pull-style content.
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// The transport end of a body transfer.
#[trait_variant::make(BodySink: Send)]
pub trait LocalBodySink {
    /// Writes one chunk of the body.
    async fn write(&mut self, bytes: Bytes) -> Result<(), SendError>;

    /// Finishes the body framing and flushes the transport.
    async fn close(&mut self) -> Result<(), SendError>;

    /// Gives up on the transfer, the transport can't be reused afterwards.
    fn abort(&mut self);
}

/// Writes `content` into `sink` under the cancellation scope of the call.
///
/// On success the sink has been closed, on any failure or cancellation it has been
/// aborted. A producer failure surfaces as [`SendError::Producer`], an
/// unsupported representation as a configuration error.
pub async fn write_body<S>(content: OutgoingContent, sink: &mut S, scope: &CallContext) -> Result<(), HttpError>
where
    S: BodySink,
{
    let result = {
        let transfer = async {
            copy_content(content, sink).await?;
            sink.close().await.map_err(send_failed)
        };

        select! {
            biased;
            () = scope.cancelled() => Err(HttpError::Cancelled),
            result = transfer => result,
        }
    };

    if let Err(e) = &result {
        debug!(cause = %e, "request body transfer failed, aborting");
        sink.abort();
    }
    result
}

async fn copy_content<S>(content: OutgoingContent, sink: &mut S) -> Result<(), HttpError>
where
    S: BodySink,
{
    match content {
        OutgoingContent::NoContent => Ok(()),

        OutgoingContent::ByteArray(content) => {
            let bytes = content.into_bytes();
            if !bytes.is_empty() {
                sink.write(bytes).await.map_err(send_failed)?;
            }
            Ok(())
        }

        OutgoingContent::ReadChannel(content) => {
            let mut stream = ReaderStream::with_capacity(content.read_from(), READ_BUFFER_SIZE);
            while let Some(bytes) = stream.next().await {
                let bytes = bytes.map_err(|e| send_failed(SendError::producer(e)))?;
                sink.write(bytes).await.map_err(send_failed)?;
            }
            Ok(())
        }

        OutgoingContent::WriteChannel(content) => relay_producer(content, sink).await,

        OutgoingContent::ProtocolUpgrade(_) => Err(ConfigError::unsupported_content("protocol upgrade").into()),
    }
}

/// Runs the producer as its own task and relays what it writes, the task is
/// aborted when the relay stops early.
async fn relay_producer<S>(content: Box<dyn WriteChannelContent>, sink: &mut S) -> Result<(), HttpError>
where
    S: BodySink,
{
    let (writer, mut reader) = byte_channel(WRITE_CHANNEL_CAPACITY);
    let mut producer = AbortOnDrop(tokio::spawn(content.write_to(writer)));

    while let Some(bytes) = reader.read().await {
        let bytes = bytes.map_err(|e| send_failed(SendError::producer(e)))?;
        sink.write(bytes).await.map_err(send_failed)?;
    }

    // the channel also ends when the producer shuts it down, fails or panics, only
    // the outcome of the task tells a complete body apart
    match (&mut producer.0).await {
        Ok(Ok(())) => {
            trace!("body producer finished");
            Ok(())
        }
        Ok(Err(e)) => Err(send_failed(SendError::producer(e))),
        Err(e) if e.is_panic() => Err(send_failed(SendError::producer(io::Error::other("body producer panicked")))),
        Err(_) => Err(HttpError::Cancelled),
    }
}

fn send_failed(e: SendError) -> HttpError {
    ConnectError::from(e).into()
}
