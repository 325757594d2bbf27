use std::fmt;
use std::time::Duration;

use http::{HeaderMap, Method, Uri};
use rustls::ClientConfig;

use crate::connection::Proxy;
use crate::protocol::PayloadSize;

/// The transport level request, built and configured before the transport is opened.
///
/// Customization hooks receive it mutably: the request customizer sees the method and
/// headers already set, the transport customizer also sees the body framing and runs
/// last, so whatever it leaves is what goes on the wire.
pub struct NativeRequest {
    url: Uri,
    secure: bool,
    proxy: Option<Proxy>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    tls: Option<ClientConfig>,
    method: Method,
    headers: HeaderMap,
    framing: Option<PayloadSize>,
}

impl NativeRequest {
    pub(crate) fn new(url: Uri, secure: bool, proxy: Option<Proxy>) -> Self {
        Self {
            url,
            secure,
            proxy,
            connect_timeout: None,
            read_timeout: None,
            request_timeout: None,
            tls: None,
            method: Method::GET,
            headers: HeaderMap::new(),
            framing: None,
        }
    }

    pub fn url(&self) -> &Uri {
        &self.url
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// `None` waits forever.
    pub fn set_connect_timeout(&mut self, timeout: Option<Duration>) {
        self.connect_timeout = timeout;
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Bounds every single read from the transport, `None` waits forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Bounds the exchange from opening the transport to the end of the response body.
    pub fn set_request_timeout(&mut self, timeout: Option<Duration>) {
        self.request_timeout = timeout;
    }

    /// The TLS configuration of a secure request, `None` for plain `http`.
    pub fn tls_config(&self) -> Option<&ClientConfig> {
        self.tls.as_ref()
    }

    pub fn tls_config_mut(&mut self) -> Option<&mut ClientConfig> {
        self.tls.as_mut()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// How the body is framed, `None` until the framing has been applied.
    pub fn framing(&self) -> Option<PayloadSize> {
        self.framing
    }

    pub(crate) fn set_tls_config(&mut self, tls: ClientConfig) {
        self.tls = Some(tls);
    }

    pub(crate) fn set_framing(&mut self, framing: PayloadSize) {
        self.framing = Some(framing);
    }

    pub(crate) fn take_tls_config(&mut self) -> Option<ClientConfig> {
        self.tls.take()
    }
}

impl fmt::Debug for NativeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRequest")
            .field("url", &self.url)
            .field("proxy", &self.proxy)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("tls", &self.tls.is_some())
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("framing", &self.framing)
            .finish()
    }
}
