//! Forward proxies.
//!
//! Plain `http` targets are sent through the proxy in absolute form, `https` targets go
//! through a `CONNECT` tunnel and then look exactly like a direct connection.

use std::fmt;

use http::Uri;
use http::uri::{PathAndQuery, Scheme};

use crate::protocol::ConfigError;

/// An HTTP forward proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    host: String,
    port: u16,
}

impl Proxy {
    /// Describes a proxy from an `http://host[:port]` uri, the port defaults to 80.
    ///
    /// A bare `host:port` is accepted too.
    pub fn http(uri: &str) -> Result<Self, ConfigError> {
        let parsed: Uri = uri.parse().map_err(|e| ConfigError::invalid_url(format!("proxy {uri}: {e}")))?;

        match parsed.scheme() {
            None => {}
            Some(scheme) if *scheme == Scheme::HTTP => {}
            Some(scheme) => return Err(ConfigError::invalid_url(format!("proxy scheme {scheme} is not supported"))),
        }

        let host = parsed.host().ok_or_else(|| ConfigError::invalid_url(format!("proxy {uri} has no host")))?;
        Ok(Self { host: host.to_owned(), port: parsed.port_u16().unwrap_or(80) })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}:{}", self.host, self.port)
    }
}

/// Picks the proxy for a target, `None` connects directly.
///
/// Selection runs once per request, before the transport is opened.
pub trait ProxySelector: Send + Sync {
    fn select(&self, target: &Uri) -> Option<Proxy>;
}

impl<F> ProxySelector for F
where
    F: Fn(&Uri) -> Option<Proxy> + Send + Sync,
{
    fn select(&self, target: &Uri) -> Option<Proxy> {
        self(target)
    }
}

/// A single proxy used for every target.
impl ProxySelector for Proxy {
    fn select(&self, _target: &Uri) -> Option<Proxy> {
        Some(self.clone())
    }
}

/// The request target written in the request line.
///
/// Origin form (`/path?query`) for direct and tunnelled requests, the absolute uri
/// when a plain `http` request goes through a proxy.
pub(crate) fn request_target(url: &Uri, proxy: Option<&Proxy>) -> Uri {
    let through_proxy = proxy.is_some() && url.scheme() != Some(&Scheme::HTTPS);
    if through_proxy && url.authority().is_some() {
        return url.clone();
    }

    let path_and_query = url.path_and_query().cloned().unwrap_or_else(|| PathAndQuery::from_static("/"));
    Uri::from(path_and_query)
}
