//! Outgoing request content.
//!
//! A request body is one of a closed set of representations, see [`OutgoingContent`].
//! Each representation describes itself (length and type when known), and the
//! [`bridge`] turns any of them into bytes on the wire.
//!
//! - [`framing`]: derives content-length / transfer-encoding from a request
//! - [`bridge`]: streams a body into a transport sink
//! - [`channel`]: the bounded pipe used by push-style producers

pub mod bridge;
pub mod channel;
pub mod framing;

pub use channel::{ByteReadChannel, ByteWriteChannel, byte_channel};

use std::fmt;
use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use tokio::io::AsyncRead;

/// The body of a request.
#[derive(Default)]
pub enum OutgoingContent {
    /// No body at all
    #[default]
    NoContent,
    /// A body fully held in memory
    ByteArray(ByteArrayContent),
    /// A body pulled from a byte source
    ReadChannel(Box<dyn ReadChannelContent>),
    /// A body pushed into a channel by a producer
    WriteChannel(Box<dyn WriteChannelContent>),
    /// A request taking over the connection, e.g. a websocket handshake
    ProtocolUpgrade(UpgradeContent),
}

impl OutgoingContent {
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self::ByteArray(ByteArrayContent::new(bytes))
    }

    /// A `text/plain; charset=utf-8` body.
    pub fn text(text: impl Into<String>) -> Self {
        let content = ByteArrayContent::new(text.into()).with_content_type(mime::TEXT_PLAIN_UTF_8);
        Self::ByteArray(content)
    }

    /// A body read from `reader` until it reports EOF.
    pub fn reader<R>(reader: R, content_length: Option<u64>) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::ReadChannel(Box::new(ReaderContent { reader, content_length, content_type: None }))
    }

    /// A body produced by `f`, which writes into the provided channel.
    ///
    /// The producer runs concurrently with the transmission. Returning an error
    /// aborts the request.
    pub fn writer<F, Fut>(content_length: Option<u64>, f: F) -> Self
    where
        F: FnOnce(ByteWriteChannel) -> Fut + Send + 'static,
        Fut: Future<Output = io::Result<()>> + Send + 'static,
    {
        Self::WriteChannel(Box::new(WriterFnContent { f, content_length }))
    }

    /// The self reported length, `Some(0)` for [`OutgoingContent::NoContent`].
    pub fn content_length(&self) -> Option<u64> {
        match self {
            OutgoingContent::NoContent => Some(0),
            OutgoingContent::ByteArray(content) => Some(content.bytes().len() as u64),
            OutgoingContent::ReadChannel(content) => content.content_length(),
            OutgoingContent::WriteChannel(content) => content.content_length(),
            OutgoingContent::ProtocolUpgrade(_) => None,
        }
    }

    pub fn content_type(&self) -> Option<&Mime> {
        match self {
            OutgoingContent::NoContent | OutgoingContent::ProtocolUpgrade(_) => None,
            OutgoingContent::ByteArray(content) => content.content_type(),
            OutgoingContent::ReadChannel(content) => content.content_type(),
            OutgoingContent::WriteChannel(content) => content.content_type(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutgoingContent::NoContent => "no content",
            OutgoingContent::ByteArray(_) => "byte array",
            OutgoingContent::ReadChannel(_) => "read channel",
            OutgoingContent::WriteChannel(_) => "write channel",
            OutgoingContent::ProtocolUpgrade(_) => "protocol upgrade",
        }
    }

    #[inline]
    pub fn is_no_content(&self) -> bool {
        matches!(self, OutgoingContent::NoContent)
    }
}

impl fmt::Debug for OutgoingContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingContent")
            .field("kind", &self.kind())
            .field("content_length", &self.content_length())
            .field("content_type", &self.content_type())
            .finish()
    }
}

impl From<Bytes> for OutgoingContent {
    fn from(bytes: Bytes) -> Self {
        Self::bytes(bytes)
    }
}

impl From<Vec<u8>> for OutgoingContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self::bytes(bytes)
    }
}

impl From<String> for OutgoingContent {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<&'static str> for OutgoingContent {
    fn from(text: &'static str) -> Self {
        Self::text(text)
    }
}

#[derive(Debug, Clone)]
pub struct ByteArrayContent {
    bytes: Bytes,
    content_type: Option<Mime>,
}

impl ByteArrayContent {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into(), content_type: None }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }
}

/// A body that is pulled from a byte source.
pub trait ReadChannelContent: Send {
    fn content_length(&self) -> Option<u64> {
        None
    }

    fn content_type(&self) -> Option<&Mime> {
        None
    }

    /// Opens the byte source, read until EOF.
    fn read_from(self: Box<Self>) -> Pin<Box<dyn AsyncRead + Send>>;
}

/// A body that pushes its bytes into a channel.
#[async_trait]
pub trait WriteChannelContent: Send {
    fn content_length(&self) -> Option<u64> {
        None
    }

    fn content_type(&self) -> Option<&Mime> {
        None
    }

    /// Writes the whole body into `channel`. Dropping the channel ends the body.
    async fn write_to(self: Box<Self>, channel: ByteWriteChannel) -> io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeContent {
    protocol: String,
}

impl UpgradeContent {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self { protocol: protocol.into() }
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }
}

struct ReaderContent<R> {
    reader: R,
    content_length: Option<u64>,
    content_type: Option<Mime>,
}

impl<R> ReadChannelContent for ReaderContent<R>
where
    R: AsyncRead + Send + 'static,
{
    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    fn read_from(self: Box<Self>) -> Pin<Box<dyn AsyncRead + Send>> {
        Box::pin(self.reader)
    }
}

struct WriterFnContent<F> {
    f: F,
    content_length: Option<u64>,
}

#[async_trait]
impl<F, Fut> WriteChannelContent for WriterFnContent<F>
where
    F: FnOnce(ByteWriteChannel) -> Fut + Send + 'static,
    Fut: Future<Output = io::Result<()>> + Send + 'static,
{
    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    async fn write_to(self: Box<Self>, channel: ByteWriteChannel) -> io::Result<()> {
        (self.f)(channel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_reported_lengths() {
        assert_eq!(OutgoingContent::NoContent.content_length(), Some(0));
        assert_eq!(OutgoingContent::bytes("hello").content_length(), Some(5));
        assert_eq!(OutgoingContent::reader(&b"abc"[..], None).content_length(), None);
        assert_eq!(OutgoingContent::reader(&b"abc"[..], Some(3)).content_length(), Some(3));
        assert_eq!(OutgoingContent::writer(Some(7), |_channel| async { Ok(()) }).content_length(), Some(7));
        assert_eq!(OutgoingContent::ProtocolUpgrade(UpgradeContent::new("websocket")).content_length(), None);
    }

    #[test]
    fn text_content_carries_its_type() {
        let content = OutgoingContent::text("hi");
        assert_eq!(content.content_type(), Some(&mime::TEXT_PLAIN_UTF_8));
        assert_eq!(content.kind(), "byte array");
        assert!(OutgoingContent::bytes(Bytes::new()).content_type().is_none());
    }

    #[test]
    fn debug_does_not_expose_the_body() {
        let debug = format!("{:?}", OutgoingContent::bytes("secret"));
        assert!(debug.contains("byte array"));
        assert!(!debug.contains("secret"));
    }
}
