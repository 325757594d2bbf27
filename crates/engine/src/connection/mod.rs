//! The transport side of an exchange.
//!
//! - [`proxy`]: proxy description and per-target selection
//! - [`connector`]: opens the transport: TCP, an optional proxy tunnel and TLS
//! - [`ClientConnection`]: writes one request and reads its response over an opened transport
//!
//! A transport carries exactly one exchange, it is never pooled.

mod client_connection;
pub(crate) mod connector;
pub mod proxy;

pub use client_connection::{ClientConnection, PayloadSink};
pub use proxy::{Proxy, ProxySelector};

use tokio::io::{AsyncRead, AsyncWrite};

/// A byte stream an exchange can run over, plain TCP or TLS.
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

pub type BoxedIo = Box<dyn Io>;
