//! Head codecs: [`HeaderEncoder`] writes request heads, [`HeaderDecoder`] parses
//! response heads and decides how the response body is framed.

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub(crate) use header_decoder::is_chunked;
pub use header_encoder::HeaderEncoder;
