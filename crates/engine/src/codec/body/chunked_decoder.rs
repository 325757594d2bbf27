//! Decoder for `transfer-encoding: chunked` response bodies, see
//! [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1).
//!
//! The decoder works line by line: a size line (hex size, optional extensions), the
//! chunk data and its CRLF, and after the zero sized chunk an optional trailer section
//! closed by an empty line. Extensions and trailers are skipped.

use crate::ensure;
use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

/// Longest size or trailer line accepted.
const MAX_LINE_BYTES: usize = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting a chunk size line
    Size,
    /// Reading chunk data, with the bytes left in the current chunk
    Data(u64),
    /// Expecting the CRLF that closes a chunk
    DataEnd,
    /// Skipping trailer fields until the empty line
    Trailer,
    End,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size }
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::Size => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    let size = parse_chunk_size(&line)?;
                    trace!(size, "read chunk size");
                    self.state = if size == 0 { State::Trailer } else { State::Data(size) };
                }

                State::Data(remaining) => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let len = remaining.min(src.len() as u64);
                    let bytes = src.split_to(len as usize).freeze();
                    self.state = if remaining == len { State::DataEnd } else { State::Data(remaining - len) };
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }

                State::DataEnd => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    ensure!(&src[..2] == b"\r\n", ParseError::invalid_body("chunk data is not followed by CRLF"));
                    src.advance(2);
                    self.state = State::Size;
                }

                State::Trailer => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    if line.is_empty() {
                        self.state = State::End;
                    }
                }

                State::End => {
                    trace!("finished reading chunked body");
                    return Ok(Some(PayloadItem::Eof));
                }
            }
        }
    }
}

/// Splits off one CRLF terminated line, without the CRLF.
fn take_line(src: &mut BytesMut) -> Result<Option<BytesMut>, ParseError> {
    match src.iter().position(|b| *b == b'\n') {
        Some(lf) => {
            ensure!(lf > 0 && src[lf - 1] == b'\r', ParseError::invalid_body("chunked line is not terminated by CRLF"));
            let mut line = src.split_to(lf + 1);
            line.truncate(lf - 1);
            Ok(Some(line))
        }
        None => {
            ensure!(src.len() <= MAX_LINE_BYTES, ParseError::invalid_body("chunked line is too long"));
            Ok(None)
        }
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, ParseError> {
    let digits = match line.iter().position(|b| *b == b';') {
        Some(extension) => &line[..extension],
        None => line,
    };
    let digits = digits.trim_ascii();
    ensure!(!digits.is_empty(), ParseError::invalid_body("missing chunk size"));

    digits.iter().try_fold(0u64, |size, b| {
        let digit = (*b as char).to_digit(16).ok_or_else(|| ParseError::invalid_body("invalid chunk size"))?;
        size.checked_mul(16)
            .and_then(|size| size.checked_add(digit as u64))
            .ok_or_else(|| ParseError::invalid_body("chunk size overflow"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn decode_all(decoder: &mut ChunkedDecoder, buffer: &mut BytesMut) -> (Vec<Bytes>, bool) {
        let mut chunks = vec![];
        while let Some(item) = decoder.decode(buffer).unwrap() {
            match item {
                PayloadItem::Chunk(bytes) => chunks.push(bytes),
                PayloadItem::Eof => return (chunks, true),
            }
        }
        (chunks, false)
    }

    #[test]
    fn multiple_chunks() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n"[..]);
        let (chunks, eof) = decode_all(&mut ChunkedDecoder::new(), &mut buffer);

        assert_eq!(chunks, vec![Bytes::from_static(b"hello"), Bytes::from_static(b", world")]);
        assert!(eof);
        assert!(buffer.is_empty());
    }

    #[test]
    fn extensions_and_trailers_are_skipped() {
        let mut buffer = BytesMut::from(&b"5;name=value\r\nhello\r\n0\r\nExpires: never\r\n\r\n"[..]);
        let (chunks, eof) = decode_all(&mut ChunkedDecoder::new(), &mut buffer);

        assert_eq!(chunks, vec![Bytes::from_static(b"hello")]);
        assert!(eof);
    }

    #[test]
    fn upper_case_hex_and_partial_data() {
        let mut decoder = ChunkedDecoder::new();
        let mut buffer = BytesMut::from(&b"1A\r\nabcdefghij"[..]);

        let first = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(first.as_bytes().unwrap().as_ref(), b"abcdefghij");
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"klmnopqrstuvwxyz\r\n0\r\n");
        let second = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(second.as_bytes().unwrap().as_ref(), b"klmnopqrstuvwxyz");

        // the final empty line has not arrived yet
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        buffer.extend_from_slice(b"\r\n");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn invalid_framing() {
        let mut buffer = BytesMut::from(&b"xyz\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());

        let mut buffer = BytesMut::from(&b"5\r\nhelloBad"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_chunk());
        assert!(decoder.decode(&mut buffer).is_err());

        let mut buffer = BytesMut::from(&b"10000000000000000\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());

        let mut buffer = BytesMut::from(&b"5\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());
    }
}
