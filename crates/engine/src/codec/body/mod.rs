//! Payload codecs.
//!
//! ## Encoders, request side
//! - [`PayloadEncoder`]: dispatches to a `content-length` or chunked encoder and
//!   checks that the body matches its announced framing
//!
//! ## Decoders, response side
//! - [`PayloadDecoder`]: dispatches to a `content-length`, chunked or read-until-close decoder

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
