//! Stream framing.
//!
//! Client frames start with a three-digit base64 length followed by that many
//! payload bytes, the first two of which are the header id. Server frames are
//! produced by [`OutboundMessage::encode`](crate::OutboundMessage::encode).

use crate::{base64, InboundMessage, ProtocolError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

pub const LENGTH_DIGITS: usize = 3;

/// Encodes a client to server frame. Used by test clients and load tools.
pub fn encode_client_frame(header: u16, body: &[u8]) -> Bytes {
    let payload_len = (body.len() + 2) as u32;
    let mut frame = BytesMut::with_capacity(LENGTH_DIGITS + 2 + body.len());
    base64::encode_into(&mut frame, payload_len, LENGTH_DIGITS);
    base64::encode_into(&mut frame, u32::from(header), 2);
    frame.put_slice(body);
    frame.freeze()
}

/// Incremental decoder over a growing byte buffer.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_len: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4 * 1024),
            max_frame_len: max_frame_len.max(2),
        }
    }

    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pops the next complete message. Payloads too short to carry a header
    /// are discarded.
    pub fn decode(&mut self) -> Result<Option<InboundMessage>, ProtocolError> {
        loop {
            if self.buf.len() < LENGTH_DIGITS {
                return Ok(None);
            }
            let len = base64::decode(&self.buf[..LENGTH_DIGITS]) as usize;
            if len > self.max_frame_len {
                return Err(ProtocolError::FrameTooLarge {
                    len,
                    max: self.max_frame_len,
                });
            }
            if self.buf.len() < LENGTH_DIGITS + len {
                return Ok(None);
            }

            self.buf.advance(LENGTH_DIGITS);
            let payload = self.buf.split_to(len).freeze();
            match InboundMessage::from_payload(payload) {
                Some(message) => return Ok(Some(message)),
                None => trace!("Discarding headerless frame of {} bytes", len),
            }
        }
    }
}

/// Async frame reader over the read half of a client stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    decoder: FrameDecoder,
}

impl<R> FrameReader<R> {
    pub fn new(inner: R, max_frame_len: usize) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(max_frame_len),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Reads one message.
    ///
    /// Returns `Ok(None)` on a clean EOF between frames.
    pub async fn read_message(&mut self) -> Result<Option<InboundMessage>, ProtocolError> {
        loop {
            if let Some(message) = self.decoder.decode()? {
                return Ok(Some(message));
            }

            let n = self.inner.read_buf(self.decoder.buffer_mut()).await?;
            if n == 0 {
                if self.decoder.buffered() == 0 {
                    return Ok(None);
                }
                return Err(ProtocolError::UnexpectedEof);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_back_to_back_frames() {
        let mut decoder = FrameDecoder::new(1024);
        decoder.buffer_mut().put_slice(&encode_client_frame(206, b""));
        decoder.buffer_mut().put_slice(&encode_client_frame(52, b"@Ehello"));

        let first = decoder.decode().unwrap().unwrap();
        assert_eq!(first.header(), 206);
        assert_eq!(first.remaining(), 0);

        let second = decoder.decode().unwrap().unwrap();
        assert_eq!(second.header(), 52);
        assert_eq!(&second.body()[..], b"@Ehello");

        assert!(decoder.decode().unwrap().is_none());
    }

    #[test]
    fn waits_for_partial_frames() {
        let frame = encode_client_frame(75, b"@E@E");
        let mut decoder = FrameDecoder::new(1024);
        decoder.buffer_mut().put_slice(&frame[..4]);
        assert!(decoder.decode().unwrap().is_none());
        decoder.buffer_mut().put_slice(&frame[4..]);
        assert_eq!(decoder.decode().unwrap().unwrap().header(), 75);
    }

    #[test]
    fn rejects_oversized_frames() {
        let mut decoder = FrameDecoder::new(8);
        decoder.buffer_mut().put_slice(&encode_client_frame(52, &[b'a'; 32]));
        assert!(matches!(
            decoder.decode(),
            Err(ProtocolError::FrameTooLarge { len: 34, max: 8 })
        ));
    }

    #[test]
    fn skips_headerless_frames() {
        let mut decoder = FrameDecoder::new(64);
        decoder.buffer_mut().put_slice(b"@@Ax");
        decoder.buffer_mut().put_slice(&encode_client_frame(196, b""));
        assert_eq!(decoder.decode().unwrap().unwrap().header(), 196);
    }

    #[tokio::test]
    async fn reader_reports_clean_and_dirty_eof() {
        let mut bytes = encode_client_frame(4, b"").to_vec();
        let mut reader = FrameReader::new(&bytes[..], 64);
        assert_eq!(reader.read_message().await.unwrap().unwrap().header(), 4);
        assert!(reader.read_message().await.unwrap().is_none());

        bytes.extend_from_slice(b"@@");
        let mut reader = FrameReader::new(&bytes[..], 64);
        reader.read_message().await.unwrap();
        assert!(matches!(
            reader.read_message().await,
            Err(ProtocolError::UnexpectedEof)
        ));
    }
}
