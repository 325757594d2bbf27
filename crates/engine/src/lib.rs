//! The engine core of an asynchronous HTTP client.
//!
//! This crate turns an abstract request description into an exchange over the wire,
//! through a pluggable engine. Callers see the same request/response model whichever
//! engine performs the I/O.
//!
//! # Example
//!
//! ```no_run
//! use http_body_util::BodyExt;
//! use micro_client_engine::engine::{EngineConfig, Http1Engine, HttpClientEngine};
//! use micro_client_engine::protocol::RequestData;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Http1Engine::new(EngineConfig::default())?;
//!
//! let response = engine.execute(RequestData::get("http://example.com/".parse()?)).await?;
//! println!("{} {}", response.status(), response.reason());
//!
//! let body = response.into_body().collect().await?.to_bytes();
//! println!("{} bytes", body.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: the request/response model, the call context and the error taxonomy
//! - [`content`]: outgoing bodies, their framing and the bridge that streams them into a transport
//! - [`engine`]: the engine contract, its configuration and the HTTP/1.1 engine
//! - [`connection`]: proxies, transport establishment and a single exchange over a transport
//! - [`codec`]: the HTTP/1.x request encoder and response decoder
//!
//! # Bodies
//!
//! A request body is one of the [`OutgoingContent`](content::OutgoingContent)
//! representations: nothing, bytes in memory, a reader pulled until EOF, or a producer
//! pushing into a channel. Known lengths are sent with `content-length`, unknown ones
//! with chunked transfer encoding.
//!
//! The response body implements `http_body::Body`. It is read lazily, one frame per
//! poll, and reading stops as soon as the call context is cancelled.
//!
//! # Limitations
//!
//! - HTTP/1.x only, one exchange per connection, no pooling
//! - no redirects or retries
//! - maximum header size: 8KB, maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod content;
pub mod engine;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
