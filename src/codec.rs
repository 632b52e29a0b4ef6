use bytes::{BufMut, Bytes, BytesMut};
use std::io;
use tokio_util::codec::Encoder;

/// Frames output lines: each line is written as-is followed by `\n`.
///
/// Unlike `tokio_util::codec::LinesCodec` this takes raw bytes, since stored values are not
/// required to be UTF-8.
pub struct LineCodec;

impl Encoder<Bytes> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, line: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(line.len() + 1);
        dst.put(line);
        dst.put_u8(b'\n');
        Ok(())
    }
}
