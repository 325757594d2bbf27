use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::{Method, StatusCode};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::trace;

use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::connection::BoxedIo;
use crate::content::bridge::BodySink;
use crate::ensure;
use crate::protocol::body::{ResponseBody, create_body_sender_receiver};
use crate::protocol::{
    CallContext, ConnectError, Deadline, Message, ParseError, PayloadItem, PayloadSize, RequestHead, ResponseHead, SendError, TimeoutError,
};

/// One request/response exchange over an opened transport.
///
/// The request is written with [`send_head`](Self::send_head) followed by the body through
/// [`payload_sink`](Self::payload_sink), then the response head is read with
/// [`read_head`](Self::read_head). The connection is finally turned into the response
/// body, which owns the read half until the body is drained or dropped.
pub struct ClientConnection {
    framed_read: FramedRead<ReadHalf<BoxedIo>, ResponseDecoder>,
    framed_write: FramedWrite<WriteHalf<BoxedIo>, RequestEncoder>,
    read_timeout: Option<Duration>,
    deadline: Option<Deadline>,
    aborted: bool,
}

impl ClientConnection {
    /// `method` is the method of the request to be sent, it decides whether the response has a body.
    pub fn new(io: BoxedIo, method: &Method, read_timeout: Option<Duration>) -> Self {
        let (reader, writer) = tokio::io::split(io);
        Self {
            framed_read: FramedRead::with_capacity(reader, ResponseDecoder::for_method(method), 8 * 1024),
            framed_write: FramedWrite::new(writer, RequestEncoder::new()),
            read_timeout,
            deadline: None,
            aborted: false,
        }
    }

    /// Bounds reading the response body by the deadline of the whole exchange.
    pub(crate) fn set_deadline(&mut self, deadline: Deadline) {
        self.deadline = Some(deadline);
    }

    pub async fn send_head(&mut self, head: RequestHead, payload_size: PayloadSize) -> Result<(), SendError> {
        let header = Message::<_, Bytes>::Header((head, payload_size));
        if payload_size.is_empty() {
            // nothing follows the head, flush it right away
            self.framed_write.send(header).await
        } else {
            self.framed_write.feed(header).await
        }
    }

    /// The sink the request body is written into, see [`write_body`](crate::content::bridge::write_body).
    pub fn payload_sink(&mut self) -> PayloadSink<'_> {
        PayloadSink { framed_write: &mut self.framed_write, aborted: &mut self.aborted }
    }

    /// Reads the final response head, skipping interim `1xx` responses other than `101`.
    ///
    /// Every read from the transport is bounded by the read timeout.
    pub async fn read_head(&mut self) -> Result<(ResponseHead, PayloadSize), ConnectError> {
        ensure!(!self.aborted, ConnectError::Closed);

        loop {
            let next = match self.read_timeout {
                Some(duration) => timeout(duration, self.framed_read.next()).await.map_err(|_| TimeoutError::socket(duration))?,
                None => self.framed_read.next().await,
            };

            match next {
                Some(Ok(Message::Header((head, payload_size)))) => {
                    let status = head.status();
                    if status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS {
                        trace!(%status, "skipping interim response");
                        continue;
                    }
                    return Ok((head, payload_size));
                }
                Some(Ok(Message::Payload(_))) => return Err(ParseError::invalid_body("payload before response head").into()),
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ConnectError::Closed),
            }
        }
    }

    /// Hands the rest of the connection over to the response body.
    ///
    /// A non empty body is read by a task spawned on the current runtime, one frame per
    /// consumer request, until the body ends, fails or `context` is cancelled.
    pub fn into_body(self, payload_size: PayloadSize, context: CallContext) -> ResponseBody {
        if payload_size.is_empty() {
            return ResponseBody::empty();
        }

        let (body_sender, body_receiver) = create_body_sender_receiver(self.framed_read, self.read_timeout, self.deadline, context, payload_size);
        tokio::spawn(body_sender.start());
        ResponseBody::channel(body_receiver)
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("read_timeout", &self.read_timeout)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

/// Writes the request body of a [`ClientConnection`], framed as announced in its head.
pub struct PayloadSink<'conn> {
    framed_write: &'conn mut FramedWrite<WriteHalf<BoxedIo>, RequestEncoder>,
    aborted: &'conn mut bool,
}

impl fmt::Debug for PayloadSink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadSink").field("aborted", &self.aborted).finish_non_exhaustive()
    }
}

impl BodySink for PayloadSink<'_> {
    async fn write(&mut self, bytes: Bytes) -> Result<(), SendError> {
        self.framed_write.send(Message::<(RequestHead, PayloadSize), _>::Payload(PayloadItem::Chunk(bytes))).await
    }

    async fn close(&mut self) -> Result<(), SendError> {
        self.framed_write.send(Message::<(RequestHead, PayloadSize), Bytes>::Payload(PayloadItem::Eof)).await
    }

    fn abort(&mut self) {
        *self.aborted = true;
    }
}
