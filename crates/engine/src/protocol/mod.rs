//! The uniform request/response model shared by every engine.
//!
//! - [`RequestData`] / [`ResponseData`]: what goes into and comes out of an engine call
//! - [`CallContext`]: the cancellation boundary of one call
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: the framing vocabulary of the codec
//! - [`body`]: the lazily read response body
//! - [`error`](HttpError): the error taxonomy every transport failure is mapped onto

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestData;
pub use request::RequestHead;
pub use request::RequestTimeouts;

mod response;
pub use response::ReasonPhrase;
pub use response::ResponseData;
pub use response::ResponseHead;

mod context;
pub use context::CallContext;
pub(crate) use context::{Deadline, expired};

mod error;
pub use error::ConfigError;
pub use error::ConnectError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
pub use error::StreamError;
pub use error::TimeoutError;
pub use error::TimeoutKind;

pub mod body;
