//! Serializes a request head: the request line, then every header.
//!
//! The body framing decided for the request is applied here, so the bytes on the wire
//! always agree with the encoder that writes the body:
//! - `Length(n)` forces `content-length: n` and drops any `transfer-encoding`
//! - `Chunked` drops `content-length` and makes `chunked` the final transfer coding,
//!   keeping the codings the caller put before it
//! - `Empty` drops both `content-length` and `transfer-encoding`

use super::header_decoder::is_chunked;
use crate::protocol::{PayloadSize, RequestHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

const CHUNKED: HeaderValue = HeaderValue::from_static("chunked");

pub struct HeaderEncoder;

impl Encoder<(RequestHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        let version = match head.version() {
            Version::HTTP_11 => "HTTP/1.1",
            Version::HTTP_10 => "HTTP/1.0",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        };

        let headers = head.headers_mut();
        match payload_size {
            PayloadSize::Length(n) => {
                headers.remove(header::TRANSFER_ENCODING);
                headers.insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Chunked => {
                headers.remove(header::CONTENT_LENGTH);
                if !headers.get_all(header::TRANSFER_ENCODING).iter().last().is_some_and(is_chunked) {
                    headers.append(header::TRANSFER_ENCODING, CHUNKED);
                }
            }
            PayloadSize::Empty => {
                headers.remove(header::CONTENT_LENGTH);
                headers.remove(header::TRANSFER_ENCODING);
            }
            PayloadSize::UntilEof => {
                return Err(SendError::invalid_body("a request body can't be delimited by closing the connection"));
            }
        }

        dst.reserve(INIT_HEADER_SIZE);
        // the uri already holds the request target in the form it is sent with: origin-form,
        // absolute-form through a proxy, authority-form for CONNECT
        write!(FastWrite(dst), "{} {} {}\r\n", head.method(), head.uri(), version)?;

        for (header_name, header_value) in head.headers().iter() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Writes straight into the reserved buffer.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Request};
    use indoc::indoc;

    fn encode(head: RequestHead, payload_size: PayloadSize) -> String {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, payload_size), &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn fixed_length_request() {
        let head = Request::builder()
            .method(Method::POST)
            .uri("/upload?id=1")
            .header("host", "example.com")
            .header("content-length", "99")
            .body(())
            .unwrap();

        let expected = indoc! {"
            POST /upload?id=1 HTTP/1.1\r
            host: example.com\r
            content-length: 5\r
            \r
        "};
        assert_eq!(encode(head, PayloadSize::Length(5)), expected);
    }

    #[test]
    fn fixed_length_drops_a_transfer_encoding() {
        let head = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header("transfer-encoding", "chunked")
            .header("content-length", "1")
            .body(())
            .unwrap();

        let expected = indoc! {"
            POST / HTTP/1.1\r
            content-length: 5\r
            \r
        "};
        assert_eq!(encode(head, PayloadSize::Length(5)), expected);
    }

    #[test]
    fn chunked_keeps_an_explicit_transfer_encoding() {
        let head = Request::builder().method(Method::PUT).uri("/").body(()).unwrap();
        assert!(encode(head, PayloadSize::Chunked).contains("transfer-encoding: chunked\r\n"));

        let head = Request::builder().method(Method::PUT).uri("/").header("Transfer-Encoding", "gzip, chunked").body(()).unwrap();
        let encoded = encode(head, PayloadSize::Chunked);
        assert!(encoded.contains("transfer-encoding: gzip, chunked\r\n"));
        assert_eq!(encoded.matches("transfer-encoding").count(), 1);
    }

    #[test]
    fn chunked_becomes_the_final_coding() {
        let head = Request::builder()
            .method(Method::PUT)
            .uri("/")
            .header("transfer-encoding", "gzip")
            .header("content-length", "12")
            .body(())
            .unwrap();

        let expected = indoc! {"
            PUT / HTTP/1.1\r
            transfer-encoding: gzip\r
            transfer-encoding: chunked\r
            \r
        "};
        assert_eq!(encode(head, PayloadSize::Chunked), expected);
    }

    #[test]
    fn empty_framing_adds_no_headers() {
        let head = Request::builder().uri("http://proxied.example/path").body(()).unwrap();
        assert_eq!(encode(head, PayloadSize::Empty), "GET http://proxied.example/path HTTP/1.1\r\n\r\n");

        let head = Request::builder().method(Method::CONNECT).uri("example.com:443").body(()).unwrap();
        assert_eq!(encode(head, PayloadSize::Empty), "CONNECT example.com:443 HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn empty_framing_drops_explicit_framing_headers() {
        let head = Request::builder()
            .uri("/")
            .header("content-length", "10")
            .header("transfer-encoding", "chunked")
            .header("accept", "*/*")
            .body(())
            .unwrap();
        assert_eq!(encode(head, PayloadSize::Empty), "GET / HTTP/1.1\r\naccept: */*\r\n\r\n");
    }

    #[test]
    fn rejects_close_delimited_requests() {
        let head = Request::builder().method(Method::POST).uri("/").body(()).unwrap();
        let mut dst = BytesMut::new();
        assert!(HeaderEncoder.encode((head, PayloadSize::UntilEof), &mut dst).is_err());
    }
}
