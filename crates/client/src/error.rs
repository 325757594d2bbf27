use std::string::FromUtf8Error;

use micro_client_engine::engine::Capability;
use micro_client_engine::protocol::{HttpError, StreamError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Engine(#[from] HttpError),

    #[error("invalid url: {reason}")]
    InvalidUrl { reason: String },

    #[error("engine doesn't support capability {capability:?}")]
    UnsupportedCapability { capability: Capability },

    #[error("response body is not valid utf-8: {source}")]
    InvalidUtf8 {
        #[from]
        source: FromUtf8Error,
    },

    #[error("interceptor failed: {reason}")]
    Interceptor { reason: String },
}

impl ClientError {
    pub fn invalid_url<S: ToString>(str: S) -> Self {
        Self::InvalidUrl { reason: str.to_string() }
    }

    pub fn interceptor<S: ToString>(str: S) -> Self {
        Self::Interceptor { reason: str.to_string() }
    }

    /// The engine error behind this error, if any.
    pub fn as_engine_error(&self) -> Option<&HttpError> {
        match self {
            ClientError::Engine(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.as_engine_error().is_some_and(HttpError::is_timeout)
    }
}

impl From<StreamError> for ClientError {
    fn from(e: StreamError) -> Self {
        Self::Engine(e.into())
    }
}
