//! The engine contract and its HTTP/1.1 implementation.
//!
//! An engine turns one [`RequestData`] into one [`ResponseData`]. It owns the
//! dispatcher every exchange runs on, and all transport failures come out of it as
//! [`HttpError`].

mod config;
mod http1_engine;
mod native;

pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_THREAD_COUNT, EngineConfig, EngineConfigBuilder, NativeHook, TlsHook,
};
pub use http1_engine::Http1Engine;
pub use native::NativeRequest;

use async_trait::async_trait;
use tokio::runtime::Handle;

use crate::protocol::{HttpError, RequestData, ResponseData};

/// Optional behaviour an engine may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Honours per-request [`RequestTimeouts`](crate::protocol::RequestTimeouts).
    Timeout,
}

#[async_trait]
pub trait HttpClientEngine: Send + Sync {
    fn config(&self) -> &EngineConfig;

    /// The runtime exchanges are executed on.
    fn dispatcher(&self) -> Handle;

    fn supported_capabilities(&self) -> &[Capability] {
        &[]
    }

    /// Performs one exchange.
    ///
    /// Resolves once the response head has been received; the body is read lazily
    /// afterwards under the context of the request. Dropping the returned future
    /// aborts the exchange.
    async fn execute(&self, request: RequestData) -> Result<ResponseData, HttpError>;

    /// Releases the dispatcher, later calls to [`execute`](Self::execute) fail.
    fn close(&self);
}
