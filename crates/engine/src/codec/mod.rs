//! HTTP/1.x client codec.
//!
//! - [`RequestEncoder`]: writes a request head, then its body framed by `content-length`
//!   or chunked transfer encoding
//! - [`ResponseDecoder`]: reads response heads, then the body framed the way the head
//!   announced it
//!
//! Both work on [`Message`](crate::protocol::Message) items and plug into
//! `tokio_util::codec::{FramedWrite, FramedRead}`.
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use http::{Method, Request};
//! use micro_client_engine::codec::RequestEncoder;
//! use micro_client_engine::protocol::{Message, PayloadItem, PayloadSize, RequestHead};
//! use tokio_util::codec::Encoder;
//!
//! let head = Request::builder().method(Method::POST).uri("/").body(()).unwrap();
//! let mut encoder = RequestEncoder::new();
//! let mut dst = BytesMut::new();
//! encoder.encode(Message::<_, Bytes>::Header((head, PayloadSize::Length(2))), &mut dst).unwrap();
//! encoder.encode(Message::<(RequestHead, PayloadSize), Bytes>::Payload(PayloadItem::Chunk(Bytes::from_static(b"hi"))), &mut dst).unwrap();
//! assert!(dst.ends_with(b"content-length: 2\r\n\r\nhi"));
//! ```

mod body;
mod header;
mod request_encoder;
mod response_decoder;

pub(crate) use header::is_chunked;
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
