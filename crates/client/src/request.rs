//! Building requests.
//!
//! An [`HttpRequestBuilder`] stays mutable until the request is sent, so interceptors
//! can still adjust the url, the headers, the body and the timeouts.

use http::header::{HeaderName, HeaderValue};
use http::uri::{Authority, PathAndQuery, Scheme};
use http::{HeaderMap, Method, Uri};
use micro_client_engine::content::OutgoingContent;
use micro_client_engine::protocol::{CallContext, RequestData, RequestTimeouts};

use crate::ClientError;

/// A url assembled from parts.
///
/// Unset parts default to `http://localhost/`, the port defaults to the one of the scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl Default for UrlBuilder {
    fn default() -> Self {
        Self { scheme: Scheme::HTTP, host: "localhost".to_owned(), port: None, path: "/".to_owned(), query: None }
    }
}

impl UrlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every part present in `url`, a relative url only replaces path and query.
    pub fn take_from(&mut self, url: &Uri) -> &mut Self {
        if let Some(scheme) = url.scheme() {
            self.scheme = scheme.clone();
        }
        if let Some(authority) = url.authority() {
            self.host = authority.host().to_owned();
            self.port = authority.port_u16();
        }
        if let Some(path_and_query) = url.path_and_query() {
            self.set_path(path_and_query.path());
            self.query = path_and_query.query().map(str::to_owned);
        }
        self
    }

    pub fn set_scheme(&mut self, scheme: Scheme) -> &mut Self {
        self.scheme = scheme;
        self
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = host.into();
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = Some(port);
        self
    }

    /// Sets the path, a missing leading `/` is added.
    pub fn set_path(&mut self, path: &str) -> &mut Self {
        self.path = if path.starts_with('/') { path.to_owned() } else { format!("/{path}") };
        self
    }

    /// Sets the raw query string, without the leading `?`.
    pub fn set_query(&mut self, query: Option<&str>) -> &mut Self {
        self.query = query.map(str::to_owned);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path and query, as sent in the request line.
    pub fn full_path(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }

    pub fn build(&self) -> Result<Uri, ClientError> {
        let authority = match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        };
        let authority: Authority = authority.parse().map_err(ClientError::invalid_url)?;
        let path_and_query: PathAndQuery = self.full_path().parse().map_err(ClientError::invalid_url)?;

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(authority)
            .path_and_query(path_and_query)
            .build()
            .map_err(ClientError::invalid_url)
    }
}

/// A request under construction.
#[derive(Debug, Default)]
pub struct HttpRequestBuilder {
    method: Method,
    url: UrlBuilder,
    headers: HeaderMap,
    body: OutgoingContent,
    timeouts: RequestTimeouts,
    context: Option<CallContext>,
}

impl HttpRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    pub fn url(&self) -> &UrlBuilder {
        &self.url
    }

    pub fn url_mut(&mut self) -> &mut UrlBuilder {
        &mut self.url
    }

    /// Takes the parts present in `url` over, see [`UrlBuilder::take_from`].
    pub fn set_url(&mut self, url: &str) -> Result<&mut Self, ClientError> {
        let url: Uri = url.parse().map_err(ClientError::invalid_url)?;
        self.url.take_from(&url);
        Ok(self)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Appends a header value, keeping values already set for `name`.
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(&self) -> &OutgoingContent {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<OutgoingContent>) -> &mut Self {
        self.body = body.into();
        self
    }

    pub fn timeouts(&self) -> &RequestTimeouts {
        &self.timeouts
    }

    pub fn timeouts_mut(&mut self) -> &mut RequestTimeouts {
        &mut self.timeouts
    }

    /// Runs the request under `context` instead of a fresh one, so it can be cancelled from outside.
    pub fn set_context(&mut self, context: CallContext) -> &mut Self {
        self.context = Some(context);
        self
    }

    pub fn build(self) -> Result<RequestData, ClientError> {
        let url = self.url.build()?;
        let context = self.context.unwrap_or_default();
        let request = RequestData::new(self.method, url, self.headers, self.body, context);

        if self.timeouts.is_empty() { Ok(request) } else { Ok(request.with_timeouts(self.timeouts)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header;

    #[test]
    fn url_defaults_and_parts() {
        assert_eq!(UrlBuilder::new().build().unwrap(), "http://localhost/");

        let mut url = UrlBuilder::new();
        url.set_port(8080).set_path("empty");
        assert_eq!(url.build().unwrap(), "http://localhost:8080/empty");
        assert_eq!(url.full_path(), "/empty");
    }

    #[test]
    fn relative_urls_only_replace_path_and_query() {
        let mut url = UrlBuilder::new();
        url.take_from(&"https://example.com:8443/base".parse().unwrap());
        url.take_from(&"/search?q=rust".parse().unwrap());

        assert_eq!(url.build().unwrap(), "https://example.com:8443/search?q=rust");
        assert_eq!(url.full_path(), "/search?q=rust");
    }

    #[test]
    fn invalid_parts_are_reported() {
        let mut url = UrlBuilder::new();
        url.set_host("not a host");
        assert!(matches!(url.build(), Err(ClientError::InvalidUrl { .. })));

        let mut request = HttpRequestBuilder::new();
        assert!(request.set_url("http://[broken").is_err());
    }

    #[test]
    fn builds_request_data() {
        let mut builder = HttpRequestBuilder::new();
        builder
            .set_method(Method::PUT)
            .header(header::ACCEPT, HeaderValue::from_static("text/plain"))
            .set_body("payload");
        builder.set_url("http://example.com/items/1").unwrap();

        let request = builder.build().unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().to_string(), "http://example.com/items/1");
        assert_eq!(request.headers()[header::ACCEPT], "text/plain");
        assert_eq!(request.body().content_length(), Some(7));
        assert!(request.timeouts().is_none());
    }
}
