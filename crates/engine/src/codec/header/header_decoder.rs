//! Parses a response status line and headers into a [`ResponseHead`].
//!
//! Header names and values are parsed with `httparse`, then sliced out of one frozen
//! buffer without copying. The body framing is decided together with the head,
//! following [RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112#section-6.3):
//!
//! 1. a response to `HEAD` or `CONNECT`, and any 1xx, 204 or 304 response, has no body
//! 2. a `transfer-encoding` ending in `chunked` means a chunked body; any other
//!    transfer coding means the body runs until the connection closes
//! 3. otherwise `content-length` gives the length
//! 4. otherwise the body runs until the connection closes
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: 8KB

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Method, Response, StatusCode, header};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, ReasonPhrase, ResponseHead};

const MAX_HEADER_NUM: usize = 64;

const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Shortest complete head, `HTTP/1.1 200\r\n\r\n`.
const MIN_HEAD_BYTES: usize = 16;

/// Decodes response heads for requests sent with `request_method`.
pub struct HeaderDecoder {
    request_method: Method,
}

impl HeaderDecoder {
    pub fn new(request_method: Method) -> Self {
        Self { request_method }
    }
}

impl Decoder for HeaderDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_HEAD_BYTES {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut res = httparse::Response::new(&mut headers);

        let parsed_result = res.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            Error::Version => ParseError::InvalidVersion(None),
            Error::Status => ParseError::InvalidStatus(None),
            e => ParseError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(body_offset) => {
                trace!(head_size = body_offset, "parsed response head");
                ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

                let version = match res.version {
                    Some(0) => http::Version::HTTP_10,
                    Some(1) => http::Version::HTTP_11,
                    _ => return Err(ParseError::InvalidVersion(res.version)),
                };

                let code = res.code.ok_or(ParseError::InvalidStatus(None))?;
                let status = StatusCode::from_u16(code).map_err(|_| ParseError::InvalidStatus(Some(code)))?;
                let reason = res.reason.map(|reason| ReasonPhrase(reason.to_owned()));

                let header_count = res.headers.len();
                let mut header_index: [HeaderIndex; MAX_HEADER_NUM] = EMPTY_HEADER_INDEX_ARRAY;
                HeaderIndex::record(src, res.headers, &mut header_index);

                let mut head = Response::new(());
                *head.status_mut() = status;
                *head.version_mut() = version;
                if let Some(reason) = reason {
                    head.extensions_mut().insert(reason);
                }

                let header_bytes = src.split_to(body_offset).freeze();
                let headers = head.headers_mut();
                headers.reserve(header_count);
                for index in &header_index[..header_count] {
                    let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1])
                        .map_err(|e| ParseError::invalid_header(e.to_string()))?;
                    let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                        .map_err(|e| ParseError::invalid_header(e.to_string()))?;
                    headers.append(name, value);
                }

                let payload_size = parse_payload(&self.request_method, &head)?;
                Ok(Some((head, payload_size)))
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}

/// Byte ranges of a header's name and value inside the parsed buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

const EMPTY_HEADER_INDEX_ARRAY: [HeaderIndex; MAX_HEADER_NUM] = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, indices) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            indices.name = (name_start, name_start + header.name.len());
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            indices.value = (value_start, value_start + header.value.len());
        }
    }
}

fn parse_payload(request_method: &Method, head: &ResponseHead) -> Result<PayloadSize, ParseError> {
    let status = head.status();
    if *request_method == Method::HEAD
        || *request_method == Method::CONNECT
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
    {
        return Ok(PayloadSize::new_empty());
    }

    let headers = head.headers();
    if let Some(te_value) = headers.get(header::TRANSFER_ENCODING) {
        return if is_chunked(te_value) { Ok(PayloadSize::new_chunked()) } else { Ok(PayloadSize::UntilEof) };
    }

    let mut lengths = headers.get_all(header::CONTENT_LENGTH).iter();
    let Some(cl_value) = lengths.next() else {
        return Ok(PayloadSize::UntilEof);
    };
    let length = parse_content_length(cl_value)?;
    for other in lengths {
        ensure!(parse_content_length(other)? == length, ParseError::invalid_content_length("conflicting content-length values"));
    }
    Ok(PayloadSize::new_length(length))
}

fn parse_content_length(value: &HeaderValue) -> Result<u64, ParseError> {
    let cl_str = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
    cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))
}

/// Chunked must be the last transfer coding when present.
pub(crate) fn is_chunked(value: &HeaderValue) -> bool {
    value.as_bytes().rsplit(|b| *b == b',').next().is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Version;
    use indoc::indoc;

    fn decode(method: Method, raw: &str) -> (ResponseHead, PayloadSize, BytesMut) {
        let mut buf = BytesMut::from(raw);
        let (head, payload_size) = HeaderDecoder::new(method).decode(&mut buf).unwrap().unwrap();
        (head, payload_size, buf)
    }

    #[test]
    fn check_is_chunked() {
        assert!(is_chunked(&HeaderValue::from_static("chunked")));
        assert!(is_chunked(&HeaderValue::from_static("gzip, Chunked")));
        assert!(!is_chunked(&HeaderValue::from_static("chunked, gzip")));
        assert!(!is_chunked(&HeaderValue::from_static("gzip")));
    }

    #[test]
    fn from_nginx() {
        let str = indoc! {r##"
        HTTP/1.1 200 OK
        Server: nginx/1.25.3
        Date: Tue, 09 Jan 2024 08:12:31 GMT
        Content-Type: text/html
        Content-Length: 5
        Connection: keep-alive
        Set-Cookie: a=1
        Set-Cookie: b=2

        hello"##};

        let (head, payload_size, rest) = decode(Method::GET, str);

        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(head.version(), Version::HTTP_11);
        assert_eq!(head.extensions().get::<ReasonPhrase>(), Some(&ReasonPhrase("OK".to_owned())));
        assert_eq!(payload_size, PayloadSize::Length(5));
        assert_eq!(&rest[..], b"hello");

        let headers = head.headers();
        assert_eq!(headers.len(), 7);
        assert_eq!(headers.get("server").unwrap(), "nginx/1.25.3");
        assert_eq!(headers.get("CONTENT-TYPE").unwrap(), "text/html");
        let cookies: Vec<_> = headers.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[test]
    fn custom_reason_and_http_10() {
        let (head, payload_size, _) = decode(Method::GET, "HTTP/1.0 404 Nothing Here\r\n\r\n");

        assert_eq!(head.status(), StatusCode::NOT_FOUND);
        assert_eq!(head.version(), Version::HTTP_10);
        assert_eq!(head.extensions().get::<ReasonPhrase>().unwrap().0, "Nothing Here");
        assert_eq!(payload_size, PayloadSize::UntilEof);
    }

    #[test]
    fn bodiless_responses() {
        let (_, payload_size, _) = decode(Method::HEAD, "HTTP/1.1 200 OK\r\nContent-Length: 120\r\n\r\n");
        assert_eq!(payload_size, PayloadSize::Empty);

        let (_, payload_size, _) = decode(Method::GET, "HTTP/1.1 204 No Content\r\nContent-Length: 3\r\n\r\n");
        assert_eq!(payload_size, PayloadSize::Empty);

        let (_, payload_size, _) = decode(Method::GET, "HTTP/1.1 304 Not Modified\r\n\r\n");
        assert_eq!(payload_size, PayloadSize::Empty);

        let (_, payload_size, _) = decode(Method::CONNECT, "HTTP/1.1 200 Connection established\r\n\r\n");
        assert_eq!(payload_size, PayloadSize::Empty);

        let (head, payload_size, _) = decode(Method::POST, "HTTP/1.1 100 Continue\r\n\r\n");
        assert_eq!(head.status(), StatusCode::CONTINUE);
        assert_eq!(payload_size, PayloadSize::Empty);
    }

    #[test]
    fn transfer_encoding_wins_over_content_length() {
        let (_, payload_size, _) =
            decode(Method::GET, "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nContent-Length: 10\r\n\r\n");
        assert_eq!(payload_size, PayloadSize::Chunked);

        let (_, payload_size, _) = decode(Method::GET, "HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip\r\n\r\n");
        assert_eq!(payload_size, PayloadSize::UntilEof);
    }

    #[test]
    fn invalid_heads() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: ten\r\n\r\n");
        assert!(matches!(HeaderDecoder::new(Method::GET).decode(&mut buf), Err(ParseError::InvalidContentLength { .. })));

        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n");
        assert!(HeaderDecoder::new(Method::GET).decode(&mut buf).is_err());

        let mut buf = BytesMut::from("HTTP/2.0 200 OK\r\n\r\n");
        assert!(HeaderDecoder::new(Method::GET).decode(&mut buf).is_err());

        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\n");
        assert!(HeaderDecoder::new(Method::GET).decode(&mut buf).unwrap().is_none());

        let mut buf = BytesMut::from(format!("HTTP/1.1 200 OK\r\nX-Large: {}", "a".repeat(MAX_HEADER_BYTES)).as_str());
        assert!(matches!(HeaderDecoder::new(Method::GET).decode(&mut buf), Err(ParseError::TooLargeHeader { .. })));
    }
}
