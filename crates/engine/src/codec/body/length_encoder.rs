use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

/// Writes a `content-length` delimited body and enforces the announced length.
///
/// Writing past the length fails at once, finishing short of it fails at EOF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    expected: u64,
    written: u64,
    eof: bool,
}

impl LengthEncoder {
    pub fn new(expected: u64) -> Self {
        Self { expected, written: 0, eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(mut bytes) => {
                let len = bytes.remaining() as u64;
                if self.written + len > self.expected {
                    return Err(SendError::length_mismatch(self.expected, self.written + len));
                }

                dst.reserve(bytes.remaining());
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let chunk_len = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(chunk_len);
                }
                self.written += len;
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                if self.written != self.expected {
                    return Err(SendError::length_mismatch(self.expected, self.written));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn writes_exactly_the_announced_length() {
        let mut encoder = LengthEncoder::new(11);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello ")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"world")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert_eq!(&dst[..], b"hello world");
        assert!(encoder.is_finish());
    }

    #[test]
    fn rejects_an_overlong_body() {
        let mut encoder = LengthEncoder::new(3);
        let mut dst = BytesMut::new();

        let error = encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"four")), &mut dst).unwrap_err();
        assert!(matches!(error, SendError::ContentLengthMismatch { expected: 3, actual: 4 }));
        assert!(dst.is_empty());
    }

    #[test]
    fn rejects_a_short_body() {
        let mut encoder = LengthEncoder::new(10);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"short")), &mut dst).unwrap();
        let error = encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap_err();
        assert!(matches!(error, SendError::ContentLengthMismatch { expected: 10, actual: 5 }));
    }
}
