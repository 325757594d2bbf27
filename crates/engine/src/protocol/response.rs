//! The response side of the engine contract.

use std::time::SystemTime;

use http::{HeaderMap, Response, StatusCode, Version};

use crate::protocol::CallContext;
use crate::protocol::body::ResponseBody;

/// The head of a response as decoded from the wire.
///
/// The reason phrase of the status line is kept in the extensions as [`ReasonPhrase`].
pub type ResponseHead = Response<()>;

/// The reason phrase of a status line, exactly as sent by the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonPhrase(pub String);

/// The result of a successful engine call.
///
/// The body has not been read yet; it has to be drained (or dropped) under the
/// returned [`CallContext`], cancelling that context aborts any outstanding read.
#[derive(Debug)]
pub struct ResponseData {
    status: StatusCode,
    reason: String,
    request_time: SystemTime,
    headers: HeaderMap,
    version: Version,
    body: ResponseBody,
    context: CallContext,
}

impl ResponseData {
    pub fn new(head: ResponseHead, request_time: SystemTime, body: ResponseBody, context: CallContext) -> Self {
        let (mut parts, ()) = head.into_parts();
        let reason = match parts.extensions.remove::<ReasonPhrase>() {
            Some(ReasonPhrase(reason)) => reason,
            None => parts.status.canonical_reason().unwrap_or_default().to_owned(),
        };

        Self { status: parts.status, reason, request_time, headers: parts.headers, version: parts.version, body, context }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Captured right before the request was sent.
    pub fn request_time(&self) -> SystemTime {
        self.request_time
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn body_mut(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }
}
