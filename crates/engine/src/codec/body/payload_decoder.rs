//! Decoder for response payloads.
//!
//! Picks one of the strategies a response body can be delimited with:
//! - `content-length`
//! - chunked transfer encoding
//! - no body at all
//! - the peer closing the connection

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    NoBody,
    /// Everything up to EOF belongs to the body, the end is signalled by `decode_eof`
    UntilEof,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub fn until_eof() -> Self {
        Self { kind: Kind::UntilEof }
    }

    /// Returns whether the end of this payload is the end of the connection.
    pub fn is_until_eof(&self) -> bool {
        matches!(self.kind, Kind::UntilEof)
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => PayloadDecoder::fix_length(size),
            PayloadSize::Chunked => PayloadDecoder::chunked(),
            PayloadSize::Empty => PayloadDecoder::empty(),
            PayloadSize::UntilEof => PayloadDecoder::until_eof(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
            Kind::UntilEof => {
                if src.is_empty() {
                    return Ok(None);
                }
                Ok(Some(PayloadItem::Chunk(src.split().freeze())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn until_eof_drains_whatever_arrives() {
        let mut decoder = PayloadDecoder::from(PayloadSize::UntilEof);
        assert!(decoder.is_until_eof());

        let mut buffer = BytesMut::from(&b"all of it"[..]);
        assert_eq!(decoder.decode(&mut buffer).unwrap().unwrap().as_bytes().unwrap().as_ref(), b"all of it");
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn no_body_is_eof_at_once() {
        let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\n"[..]);
        assert!(PayloadDecoder::empty().decode(&mut buffer).unwrap().unwrap().is_eof());
        assert_eq!(buffer.len(), 17);
    }
}
