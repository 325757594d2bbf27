//! The request side of the engine contract.

use std::time::Duration;

use http::{HeaderMap, Method, Request, Uri};

use crate::content::OutgoingContent;
use crate::protocol::CallContext;

/// The head of a request as written to the wire, the body is streamed separately.
pub type RequestHead = Request<()>;

/// Everything an engine needs to perform one exchange.
///
/// Built by the caller, consumed by value by [`HttpClientEngine::execute`](crate::engine::HttpClientEngine::execute).
#[derive(Debug)]
pub struct RequestData {
    url: Uri,
    method: Method,
    headers: HeaderMap,
    body: OutgoingContent,
    context: CallContext,
    timeouts: Option<RequestTimeouts>,
}

impl RequestData {
    pub fn new(method: Method, url: Uri, headers: HeaderMap, body: OutgoingContent, context: CallContext) -> Self {
        Self { url, method, headers, body, context, timeouts: None }
    }

    /// A body-less request under a fresh call context.
    pub fn get(url: Uri) -> Self {
        Self::new(Method::GET, url, HeaderMap::new(), OutgoingContent::NoContent, CallContext::new())
    }

    /// Attaches per-request timeout overrides, honoured by engines declaring
    /// [`Capability::Timeout`](crate::engine::Capability::Timeout).
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: RequestTimeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    pub fn url(&self) -> &Uri {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &OutgoingContent {
        &self.body
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn timeouts(&self) -> Option<&RequestTimeouts> {
        self.timeouts.as_ref()
    }

    pub(crate) fn into_body(self) -> OutgoingContent {
        self.body
    }
}

/// Per-request timeout overrides.
///
/// `None` leaves the engine's configured value in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestTimeouts {
    /// Bounds the whole exchange, reading the response body included.
    pub request: Option<Duration>,
    pub connect: Option<Duration>,
    pub socket: Option<Duration>,
}

impl RequestTimeouts {
    pub fn is_empty(&self) -> bool {
        self.request.is_none() && self.connect.is_none() && self.socket.is_none()
    }
}
