use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::{Sink, SinkExt, StreamExt, channel::mpsc};
use http_body::{Body, Frame, SizeHint};
use tokio::io::AsyncRead;
use tokio::select;
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, trace};

use crate::codec::ResponseDecoder;
use crate::protocol::{CallContext, Deadline, Message, ParseError, PayloadItem, PayloadSize, StreamError, TimeoutError, expired};

pub(crate) fn create_body_sender_receiver<R: AsyncRead + Unpin>(
    framed_read: FramedRead<R, ResponseDecoder>,
    read_timeout: Option<Duration>,
    deadline: Option<Deadline>,
    context: CallContext,
    payload_size: PayloadSize,
) -> (BodySender<R>, BodyReceiver) {
    let (signal_sender, signal_receiver) = mpsc::channel(8);
    let (data_sender, data_receiver) = mpsc::channel(8);

    (
        BodySender::new(framed_read, read_timeout, deadline, context, signal_receiver, data_sender),
        BodyReceiver::new(signal_sender, data_receiver, payload_size),
    )
}

pub(crate) enum BodyRequestSignal {
    RequestData,
}

/// Owns the read half of the connection and reads one payload item per request
/// from the [`BodyReceiver`].
///
/// The connection is released when the sender finishes: at EOF, on the first error,
/// when the receiver is dropped, when the call context is cancelled or when the
/// request deadline passes.
pub(crate) struct BodySender<R> {
    framed_read: FramedRead<R, ResponseDecoder>,
    read_timeout: Option<Duration>,
    deadline: Option<Deadline>,
    context: CallContext,
    signal_receiver: mpsc::Receiver<BodyRequestSignal>,
    data_sender: mpsc::Sender<Result<PayloadItem, StreamError>>,
}

impl<R> BodySender<R>
where
    R: AsyncRead + Unpin,
{
    fn new(
        framed_read: FramedRead<R, ResponseDecoder>,
        read_timeout: Option<Duration>,
        deadline: Option<Deadline>,
        context: CallContext,
        signal_receiver: mpsc::Receiver<BodyRequestSignal>,
        data_sender: mpsc::Sender<Result<PayloadItem, StreamError>>,
    ) -> Self {
        Self { framed_read, read_timeout, deadline, context, signal_receiver, data_sender }
    }

    pub(crate) async fn start(mut self) {
        let context = self.context.clone();
        let deadline = self.deadline;

        loop {
            let signal = select! {
                biased;
                () = context.cancelled() => {
                    debug!("call cancelled while response body was pending");
                    self.send_error(StreamError::Cancelled).await;
                    return;
                }
                timeout = expired(deadline) => {
                    debug!(cause = %timeout, "request deadline passed while response body was pending");
                    self.send_error(timeout.into()).await;
                    return;
                }
                signal = self.signal_receiver.next() => signal,
            };

            match signal {
                Some(BodyRequestSignal::RequestData) => {}
                None => {
                    trace!("response body dropped, releasing connection");
                    return;
                }
            }

            let result = select! {
                biased;
                () = context.cancelled() => Err(StreamError::Cancelled),
                timeout = expired(deadline) => Err(timeout.into()),
                result = self.read_data() => result,
            };

            match result {
                Ok(payload_item) => {
                    let eof = payload_item.is_eof();
                    if let Err(e) = self.data_sender.send(Ok(payload_item)).await {
                        debug!("response body receiver is gone, {}", e);
                        return;
                    }
                    if eof {
                        return;
                    }
                }
                Err(e) => {
                    error!(cause = %e, "failed to read response body");
                    self.send_error(e).await;
                    return;
                }
            }
        }
    }

    async fn read_data(&mut self) -> Result<PayloadItem, StreamError> {
        let next = match self.read_timeout {
            Some(duration) => timeout(duration, self.framed_read.next()).await.map_err(|_| TimeoutError::socket(duration))?,
            None => self.framed_read.next().await,
        };

        match next {
            Some(Ok(Message::Payload(payload_item))) => Ok(payload_item),
            Some(Ok(Message::Header(_))) => Err(ParseError::invalid_body("received a response head while reading the body").into()),
            Some(Err(e)) => Err(e.into()),
            None => Err(StreamError::UnexpectedEof),
        }
    }

    async fn send_error(&mut self, e: StreamError) {
        if let Err(send_error) = self.data_sender.send(Err(e)).await {
            debug!("failed to deliver body error, receiver is gone, {}", send_error);
        }
    }
}

#[derive(Debug)]
pub(crate) struct BodyReceiver {
    signal_sender: mpsc::Sender<BodyRequestSignal>,
    data_receiver: mpsc::Receiver<Result<PayloadItem, StreamError>>,
    payload_size: PayloadSize,
    in_flight: bool,
    eof: bool,
}

impl BodyReceiver {
    pub(crate) fn new(
        signal_sender: mpsc::Sender<BodyRequestSignal>,
        data_receiver: mpsc::Receiver<Result<PayloadItem, StreamError>>,
        payload_size: PayloadSize,
    ) -> Self {
        Self { signal_sender, data_receiver, payload_size, in_flight: false, eof: false }
    }
}

impl std::fmt::Debug for BodyRequestSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RequestData")
    }
}

impl Body for BodyReceiver {
    type Data = Bytes;
    type Error = StreamError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if this.eof {
            return Poll::Ready(None);
        }

        if !this.in_flight {
            match Pin::new(&mut this.signal_sender).poll_ready(cx) {
                Poll::Ready(Ok(())) => {
                    if let Err(e) = Pin::new(&mut this.signal_sender).start_send(BodyRequestSignal::RequestData) {
                        debug!("failed to request more body data, {}", e);
                        return Poll::Ready(Some(Err(StreamError::ChannelClosed)));
                    }
                    this.in_flight = true;
                }
                Poll::Ready(Err(e)) => {
                    // the sender may already have queued its final error before leaving
                    debug!("body sender has finished, {}", e);
                    this.in_flight = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }

        match this.data_receiver.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(PayloadItem::Chunk(bytes)))) => {
                this.in_flight = false;
                Poll::Ready(Some(Ok(Frame::data(bytes))))
            }
            Poll::Ready(Some(Ok(PayloadItem::Eof))) => {
                this.in_flight = false;
                this.eof = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.in_flight = false;
                this.eof = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.in_flight = false;
                this.eof = true;
                Poll::Ready(Some(Err(StreamError::ChannelClosed)))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.eof
    }

    fn size_hint(&self) -> SizeHint {
        self.payload_size.into()
    }
}
