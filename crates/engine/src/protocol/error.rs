use std::fmt;
use std::io;
use std::time::Duration;

use http::{Method, StatusCode};
use thiserror::Error;

/// The error of a single engine call.
///
/// Every transport failure is translated into one of these variants at the engine
/// boundary. Timeouts are carried inside [`ConnectError`] and [`StreamError`] so callers
/// can tell a retryable deadline apart from a hard failure through [`HttpError::timeout`].
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("configuration error: {source}")]
    Configuration {
        #[from]
        source: ConfigError,
    },

    #[error("connection error: {source}")]
    Connect {
        #[from]
        source: ConnectError,
    },

    #[error("stream error: {source}")]
    Stream {
        #[from]
        source: StreamError,
    },

    #[error("call has been cancelled")]
    Cancelled,
}

impl HttpError {
    /// Returns the timeout that caused this error, if any.
    pub fn timeout(&self) -> Option<&TimeoutError> {
        match self {
            HttpError::Connect { source: ConnectError::Timeout(timeout) } => Some(timeout),
            HttpError::Stream { source: StreamError::Timeout(timeout) } => Some(timeout),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout().is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, HttpError::Cancelled | HttpError::Stream { source: StreamError::Cancelled })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, HttpError::Configuration { .. })
    }
}

/// Fatal misconfiguration of a request or of the engine, never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("request of type {method} couldn't send a body")]
    BodyNotAllowed { method: Method },

    #[error("unsupported content type: {kind}")]
    UnsupportedContent { kind: &'static str },

    #[error("invalid url: {reason}")]
    InvalidUrl { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid engine config: {reason}")]
    InvalidConfig { reason: String },

    #[error("tls setup failed: {reason}")]
    Tls { reason: String },

    #[error("engine has been closed")]
    EngineClosed,

    #[error("failed to start dispatcher: {source}")]
    Dispatcher {
        #[from]
        source: io::Error,
    },
}

impl ConfigError {
    pub fn body_not_allowed(method: &Method) -> Self {
        Self::BodyNotAllowed { method: method.clone() }
    }

    pub fn unsupported_content(kind: &'static str) -> Self {
        Self::UnsupportedContent { kind }
    }

    pub fn invalid_url<S: ToString>(str: S) -> Self {
        Self::InvalidUrl { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_config<S: ToString>(str: S) -> Self {
        Self::InvalidConfig { reason: str.to_string() }
    }

    pub fn tls<S: ToString>(str: S) -> Self {
        Self::Tls { reason: str.to_string() }
    }
}

/// Failure before the response head has been received.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("proxy refused to open a tunnel, status: {status}")]
    ProxyTunnel { status: StatusCode },

    #[error("invalid response head: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("failed to send request: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("connection closed before the response head was received")]
    Closed,
}

impl ConnectError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Failure while reading a response body whose head has already been received.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("invalid response body: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("connection closed before the response body was complete")]
    UnexpectedEof,

    #[error("response body read has been cancelled")]
    Cancelled,

    #[error("response body channel closed unexpectedly")]
    ChannelClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// establishing the transport connection
    Connect,
    /// waiting for bytes from the peer
    Socket,
    /// the whole exchange, from send to response head
    Request,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutKind::Connect => f.write_str("connect"),
            TimeoutKind::Socket => f.write_str("socket"),
            TimeoutKind::Request => f.write_str("request"),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{kind} timeout has expired after {duration:?}")]
pub struct TimeoutError {
    kind: TimeoutKind,
    duration: Duration,
}

impl TimeoutError {
    pub fn new(kind: TimeoutKind, duration: Duration) -> Self {
        Self { kind, duration }
    }

    pub fn connect(duration: Duration) -> Self {
        Self::new(TimeoutKind::Connect, duration)
    }

    pub fn socket(duration: Duration) -> Self {
        Self::new(TimeoutKind::Socket, duration)
    }

    pub fn request(duration: Duration) -> Self {
        Self::new(TimeoutKind::Request, duration)
    }

    pub fn kind(&self) -> TimeoutKind {
        self.kind
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid status code: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("body length mismatch, declared {expected} bytes but {actual} were written")]
    ContentLengthMismatch { expected: u64, actual: u64 },

    #[error("body producer failed: {source}")]
    Producer { source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn length_mismatch(expected: u64, actual: u64) -> Self {
        Self::ContentLengthMismatch { expected, actual }
    }

    pub fn producer<E: Into<io::Error>>(e: E) -> Self {
        Self::Producer { source: e.into() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_visible_through_both_failure_kinds() {
        let connect: HttpError = ConnectError::from(TimeoutError::connect(Duration::from_secs(1))).into();
        let stream: HttpError = StreamError::from(TimeoutError::socket(Duration::from_secs(2))).into();
        let io: HttpError = ConnectError::io(io::Error::from(io::ErrorKind::ConnectionRefused)).into();

        assert_eq!(connect.timeout().map(TimeoutError::kind), Some(TimeoutKind::Connect));
        assert_eq!(stream.timeout().map(TimeoutError::kind), Some(TimeoutKind::Socket));
        assert!(!io.is_timeout());
    }

    #[test]
    fn cancellation_is_recognised_in_body_errors() {
        assert!(HttpError::Cancelled.is_cancelled());
        assert!(HttpError::from(StreamError::Cancelled).is_cancelled());
        assert!(!HttpError::from(StreamError::UnexpectedEof).is_cancelled());
    }

    #[test]
    fn display_messages() {
        let error = ConfigError::body_not_allowed(&Method::GET);
        assert_eq!(error.to_string(), "request of type GET couldn't send a body");

        let error = TimeoutError::request(Duration::from_millis(10));
        assert_eq!(error.to_string(), "request timeout has expired after 10ms");
    }
}
