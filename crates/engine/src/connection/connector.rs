//! Opens the transport of one exchange.
//!
//! The whole establishment (TCP connect, proxy tunnel and TLS handshake) is bounded
//! by the connect timeout.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::header::HOST;
use http::{Method, Request, Uri};
use rustls::ClientConfig;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace};

use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::connection::{BoxedIo, Proxy};
use crate::ensure;
use crate::protocol::{ConfigError, ConnectError, Message, ParseError, PayloadSize, TimeoutError};

/// Where a request goes: host, port and whether the transport is TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    host: String,
    port: u16,
    secure: bool,
}

impl Endpoint {
    pub(crate) fn from_uri(url: &Uri) -> Result<Self, ConfigError> {
        let secure = match url.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            Some(scheme) => return Err(ConfigError::invalid_url(format!("unsupported scheme {scheme} in {url}"))),
            None => return Err(ConfigError::invalid_url(format!("{url} is not an absolute url"))),
        };

        let host = url.host().ok_or_else(|| ConfigError::invalid_url(format!("{url} has no host")))?;
        let port = url.port_u16().unwrap_or(if secure { 443 } else { 80 });
        Ok(Self { host: unbracket(host).to_owned(), port, secure })
    }

    pub(crate) fn is_secure(&self) -> bool {
        self.secure
    }

    /// `host:port`, IPv6 hosts in brackets.
    fn authority(&self) -> String {
        if self.host.contains(':') { format!("[{}]:{}", self.host, self.port) } else { format!("{}:{}", self.host, self.port) }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "https" } else { "http" };
        write!(f, "{scheme}://{}", self.authority())
    }
}

/// Opens a transport to `endpoint`, through `proxy` when given.
///
/// `tls` is required for secure endpoints and ignored otherwise.
pub(crate) async fn open(
    endpoint: &Endpoint,
    proxy: Option<&Proxy>,
    connect_timeout: Option<Duration>,
    tls: Option<Arc<ClientConfig>>,
) -> Result<BoxedIo, ConnectError> {
    let establish = establish(endpoint, proxy, tls);
    match connect_timeout {
        Some(duration) => timeout(duration, establish).await.map_err(|_| TimeoutError::connect(duration))?,
        None => establish.await,
    }
}

async fn establish(endpoint: &Endpoint, proxy: Option<&Proxy>, tls: Option<Arc<ClientConfig>>) -> Result<BoxedIo, ConnectError> {
    let stream = match proxy {
        Some(proxy) => {
            debug!(%proxy, target = %endpoint, "connecting through proxy");
            let stream = tcp_connect(unbracket(proxy.host()), proxy.port()).await?;
            if endpoint.secure { tunnel(stream, endpoint).await? } else { stream }
        }
        None => {
            debug!(target = %endpoint, "connecting");
            tcp_connect(&endpoint.host, endpoint.port).await?
        }
    };

    if !endpoint.secure {
        return Ok(Box::new(stream));
    }

    let tls = tls.ok_or_else(|| ConnectError::io(io::Error::other("secure endpoint without tls configuration")))?;
    let server_name =
        ServerName::try_from(endpoint.host.clone()).map_err(|e| ConnectError::io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
    let stream = TlsConnector::from(tls).connect(server_name, stream).await?;
    trace!(target = %endpoint, "tls handshake finished");
    Ok(Box::new(stream))
}

async fn tcp_connect(host: &str, port: u16) -> Result<TcpStream, ConnectError> {
    let stream = TcpStream::connect((host, port)).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Asks the proxy for a `CONNECT` tunnel to `endpoint`.
async fn tunnel(mut stream: TcpStream, endpoint: &Endpoint) -> Result<TcpStream, ConnectError> {
    let authority = endpoint.authority();
    let head = Request::connect(authority.as_str())
        .header(HOST, authority.as_str())
        .body(())
        .map_err(|e| ConnectError::io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    {
        let mut framed_write = FramedWrite::new(&mut stream, RequestEncoder::new());
        framed_write.send(Message::<_, Bytes>::Header((head, PayloadSize::Empty))).await?;
    }

    let status = {
        let mut framed_read = FramedRead::new(&mut stream, ResponseDecoder::for_method(&Method::CONNECT));
        let status = loop {
            match framed_read.next().await {
                Some(Ok(Message::Header((head, _)))) if head.status().is_informational() => continue,
                Some(Ok(Message::Header((head, _)))) => break head.status(),
                Some(Ok(Message::Payload(_))) => return Err(ParseError::invalid_body("payload before tunnel response").into()),
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ConnectError::Closed),
            }
        };
        // a refusal may carry a body, only an accepted tunnel must start clean
        ensure!(status.is_success(), ConnectError::ProxyTunnel { status });
        ensure!(framed_read.read_buffer().is_empty(), ParseError::invalid_body("proxy sent data ahead of the tunnel").into());
        status
    };

    trace!(target = %endpoint, %status, "proxy tunnel established");
    Ok(stream)
}

fn unbracket(host: &str) -> &str {
    host.strip_prefix('[').and_then(|host| host.strip_suffix(']')).unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn fake_proxy(response: &'static [u8]) -> (Proxy, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy = Proxy::http(&format!("http://{}", listener.local_addr().unwrap())).unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0; 1024];
            let n = stream.read(&mut buf).await.unwrap();
            stream.write_all(response).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (proxy, handle)
    }

    #[test]
    fn endpoints_from_urls() {
        let endpoint = Endpoint::from_uri(&"https://example.com/path".parse().unwrap()).unwrap();
        assert_eq!(endpoint, Endpoint { host: "example.com".into(), port: 443, secure: true });

        let endpoint = Endpoint::from_uri(&"http://[::1]:8080/".parse().unwrap()).unwrap();
        assert_eq!(endpoint.host, "::1");
        assert_eq!(endpoint.to_string(), "http://[::1]:8080");

        assert!(matches!(Endpoint::from_uri(&"ftp://example.com/".parse().unwrap()), Err(ConfigError::InvalidUrl { .. })));
        assert!(matches!(Endpoint::from_uri(&"/relative".parse().unwrap()), Err(ConfigError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn tunnel_through_proxy() {
        let (proxy, handle) = fake_proxy(b"HTTP/1.1 200 Connection established\r\n\r\n").await;
        let stream = tcp_connect(proxy.host(), proxy.port()).await.unwrap();
        let endpoint = Endpoint { host: "example.com".into(), port: 443, secure: true };

        tunnel(stream, &endpoint).await.unwrap();

        let request = handle.await.unwrap();
        assert!(request.starts_with("CONNECT example.com:443 HTTP/1.1\r\n"), "{request}");
        assert!(request.contains("host: example.com:443\r\n"));
    }

    #[tokio::test]
    async fn refused_tunnel() {
        let (proxy, _handle) = fake_proxy(b"HTTP/1.1 407 Proxy Authentication Required\r\ncontent-length: 0\r\n\r\n").await;
        let stream = tcp_connect(proxy.host(), proxy.port()).await.unwrap();
        let endpoint = Endpoint { host: "example.com".into(), port: 443, secure: true };

        let error = tunnel(stream, &endpoint).await.unwrap_err();
        assert!(matches!(error, ConnectError::ProxyTunnel { status } if status == StatusCode::PROXY_AUTHENTICATION_REQUIRED));
    }

    #[tokio::test]
    async fn refused_tunnel_with_a_body() {
        let (proxy, _handle) =
            fake_proxy(b"HTTP/1.1 407 Proxy Authentication Required\r\ncontent-length: 13\r\n\r\naccess denied").await;
        let stream = tcp_connect(proxy.host(), proxy.port()).await.unwrap();
        let endpoint = Endpoint { host: "example.com".into(), port: 443, secure: true };

        let error = tunnel(stream, &endpoint).await.unwrap_err();
        assert!(matches!(error, ConnectError::ProxyTunnel { status } if status == StatusCode::PROXY_AUTHENTICATION_REQUIRED), "{error}");
    }

    #[tokio::test]
    async fn connect_timeout_bounds_the_tunnel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy = Proxy::http(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        let _silent = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let endpoint = Endpoint { host: "example.com".into(), port: 443, secure: true };
        let result = open(&endpoint, Some(&proxy), Some(Duration::from_millis(50)), None).await;

        match result {
            Err(ConnectError::Timeout(timeout)) => assert_eq!(timeout, TimeoutError::connect(Duration::from_millis(50))),
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("tunnel should not have been established"),
        }
    }
}
