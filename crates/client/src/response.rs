use std::time::SystemTime;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use http_body_util::BodyExt;
use micro_client_engine::protocol::body::ResponseBody;
use micro_client_engine::protocol::{CallContext, ResponseData};

use crate::ClientError;

/// What was actually sent, after every interceptor ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub method: Method,
    pub url: Uri,
}

impl SentRequest {
    /// Path and query of the url.
    pub fn full_path(&self) -> &str {
        self.url.path_and_query().map_or("/", |path_and_query| path_and_query.as_str())
    }
}

/// A response whose body hasn't been read yet.
#[derive(Debug)]
pub struct HttpResponse {
    request: SentRequest,
    data: ResponseData,
}

impl HttpResponse {
    pub(crate) fn new(request: SentRequest, data: ResponseData) -> Self {
        Self { request, data }
    }

    pub fn request(&self) -> &SentRequest {
        &self.request
    }

    pub fn status(&self) -> StatusCode {
        self.data.status()
    }

    pub fn reason(&self) -> &str {
        self.data.reason()
    }

    pub fn version(&self) -> Version {
        self.data.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.data.headers()
    }

    pub fn request_time(&self) -> SystemTime {
        self.data.request_time()
    }

    /// Cancelling the context stops reading the body.
    pub fn context(&self) -> &CallContext {
        self.data.context()
    }

    pub fn into_body(self) -> ResponseBody {
        self.data.into_body()
    }

    /// Reads the whole body.
    pub async fn bytes(self) -> Result<Bytes, ClientError> {
        let collected = self.data.into_body().collect().await?;
        Ok(collected.to_bytes())
    }

    /// Reads the whole body as utf-8 text.
    pub async fn text(self) -> Result<String, ClientError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8(bytes.into())?)
    }
}
