//! Body framing of outgoing requests.
//!
//! Framing is resolved from the method, the explicit headers and the content before
//! any connection is opened, so a misconfigured request never reaches the network.

use http::header;
use http::{HeaderMap, HeaderValue, Method, Uri};

use crate::codec::is_chunked;
use crate::content::OutgoingContent;
use crate::protocol::{ConfigError, PayloadSize};

/// The `user-agent` sent when the caller sets none.
pub const DEFAULT_USER_AGENT: &str = concat!("micro-client/", env!("CARGO_PKG_VERSION"));

/// Whether a request with this method may carry a body.
///
/// Only `GET` and `HEAD` are body-less, `DELETE` and `OPTIONS` bodies are sent as given.
pub fn supports_body(method: &Method) -> bool {
    !(method == Method::GET || method == Method::HEAD)
}

/// The body length to announce: an explicit `content-length` header wins over the
/// length the content reports for itself.
pub fn content_length(headers: &HeaderMap, content: &OutgoingContent) -> Result<Option<u64>, ConfigError> {
    match headers.get(header::CONTENT_LENGTH) {
        Some(value) => {
            let length = value
                .to_str()
                .ok()
                .and_then(|value| value.trim().parse::<u64>().ok())
                .ok_or_else(|| ConfigError::invalid_header(format!("content-length {value:?} is not a valid length")))?;
            Ok(Some(length))
        }
        None => Ok(content.content_length()),
    }
}

/// Decides how the body of a request is framed on the wire.
///
/// | content | method | framing |
/// |---|---|---|
/// | no content | `GET`, `HEAD` | [`PayloadSize::Empty`] |
/// | no content | others | `Length(0)` |
/// | protocol upgrade | any | unsupported |
/// | any body | `GET`, `HEAD` | not allowed |
/// | explicit `transfer-encoding` ending in `chunked` | others | [`PayloadSize::Chunked`] |
/// | known length | others | `Length(n)` |
/// | unknown length | others | [`PayloadSize::Chunked`] |
pub fn resolve_framing(method: &Method, headers: &HeaderMap, content: &OutgoingContent) -> Result<PayloadSize, ConfigError> {
    match content {
        OutgoingContent::NoContent if supports_body(method) => Ok(PayloadSize::Length(0)),
        OutgoingContent::NoContent => Ok(PayloadSize::Empty),
        OutgoingContent::ProtocolUpgrade(_) => Err(ConfigError::unsupported_content(content.kind())),
        _ if !supports_body(method) => Err(ConfigError::body_not_allowed(method)),
        _ if headers.get_all(header::TRANSFER_ENCODING).iter().last().is_some_and(is_chunked) => Ok(PayloadSize::Chunked),
        _ => match content_length(headers, content)? {
            Some(length) => Ok(PayloadSize::Length(length)),
            None => Ok(PayloadSize::Chunked),
        },
    }
}

/// Headers the engine derives for a request: `host`, a default `user-agent`,
/// `connection: close` and the content type of the body.
pub fn computed_headers(url: &Uri, content: &OutgoingContent) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::with_capacity(4);
    headers.insert(header::HOST, host_header(url)?);
    headers.insert(header::USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));

    if let Some(content_type) = content.content_type() {
        let value = HeaderValue::from_str(content_type.as_ref()).map_err(ConfigError::invalid_header)?;
        headers.insert(header::CONTENT_TYPE, value);
    }
    Ok(headers)
}

/// Lays the explicit headers over the computed ones.
///
/// Every header name set by the caller replaces all computed values of that name,
/// comparing names case-insensitively. Multiple explicit values of one name are kept.
pub fn merge_headers(mut computed: HeaderMap, explicit: &HeaderMap) -> HeaderMap {
    for name in explicit.keys() {
        computed.remove(name);
    }

    for (name, value) in explicit {
        computed.append(name.clone(), value.clone());
    }
    computed
}

fn host_header(url: &Uri) -> Result<HeaderValue, ConfigError> {
    let host = url.host().ok_or_else(|| ConfigError::invalid_url(format!("{url} has no host")))?;
    let default_port = match url.scheme_str() {
        Some("https") => 443,
        _ => 80,
    };

    let value = match url.port_u16() {
        Some(port) if port != default_port => format!("{host}:{port}"),
        _ => host.to_owned(),
    };
    HeaderValue::from_str(&value).map_err(ConfigError::invalid_url)
}
