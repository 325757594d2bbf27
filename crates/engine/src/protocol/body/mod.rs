//! The response body handed back to callers.
//!
//! A [`ResponseBody`] is demand driven: nothing is read from the connection until the
//! consumer polls for the next frame. Each poll sends one request signal to a
//! background reader that owns the read half of the connection, which answers with
//! one payload item. Dropping the body drops the reader and with it the connection.

mod body_channel;

pub(crate) use body_channel::create_body_sender_receiver;

use body_channel::BodyReceiver;

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};

use crate::protocol::StreamError;

#[derive(Debug)]
pub struct ResponseBody {
    kind: Kind,
}

#[derive(Debug)]
enum Kind {
    Empty,
    Channel(BodyReceiver),
}

impl ResponseBody {
    /// A body that ends immediately, used for bodiless responses.
    pub fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    pub(crate) fn channel(receiver: BodyReceiver) -> Self {
        Self { kind: Kind::Channel(receiver) }
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = StreamError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().kind {
            Kind::Empty => Poll::Ready(None),
            Kind::Channel(receiver) => Pin::new(receiver).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Empty => true,
            Kind::Channel(receiver) => Body::is_end_stream(receiver),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            Kind::Empty => SizeHint::with_exact(0),
            Kind::Channel(receiver) => Body::size_hint(receiver),
        }
    }
}
