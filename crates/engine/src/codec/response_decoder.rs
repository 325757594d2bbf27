//! Streaming decoder for HTTP/1.x responses.
//!
//! The decoder yields the response head first, then payload items up to EOF.
//! Interim `1xx` heads (other than `101 Switching Protocols`) carry no body and are
//! followed by the next head, so the caller sees them as consecutive
//! [`Message::Header`] items.

use std::io;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, ResponseHead};
use bytes::BytesMut;
use http::{Method, StatusCode};
use tokio_util::codec::Decoder;

/// Decodes the response to a request sent with a given method.
///
/// - `payload_decoder` is `None` while a head is expected
/// - `Some(_)` while the body of the last head is being read
pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl ResponseDecoder {
    pub fn for_method(request_method: &Method) -> Self {
        Self { header_decoder: HeaderDecoder::new(request_method.clone()), payload_decoder: None }
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.header_decoder.decode(src)? {
            Some((head, payload_size)) => {
                if !is_interim(head.status()) {
                    self.payload_decoder = Some(payload_size.into());
                }
                Some(Message::Header((head, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }

        // the connection closing is the end of a close delimited body
        if self.payload_decoder.as_ref().is_some_and(PayloadDecoder::is_until_eof) {
            self.payload_decoder.take();
            return Ok(Some(Message::Payload(PayloadItem::Eof)));
        }

        if src.is_empty() {
            Ok(None)
        } else {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed in the middle of a response").into())
        }
    }
}

fn is_interim(status: StatusCode) -> bool {
    status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS
}
