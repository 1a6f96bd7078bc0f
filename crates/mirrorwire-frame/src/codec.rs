use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Default accumulator cap for the control reader: 256 KiB.
pub const DEFAULT_MAX_BUFFERED: usize = 256 * 1024;

/// Length prefix size of [`LengthDelimitedCodec`].
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Pops complete control messages off an accumulating buffer.
pub trait MessageDecoder {
    type Message;

    /// Decode one message from the front of `src`.
    ///
    /// Returns `Ok(None)` and leaves `src` untouched if it does not hold a
    /// complete message yet. On success, consumes exactly the message bytes.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Message>>;
}

/// Serializes one device message.
pub trait MessageEncoder {
    type Message;

    /// Append the wire form of `msg` to `dst`.
    fn encode(&mut self, msg: &Self::Message, dst: &mut BytesMut) -> Result<()>;
}

/// Opaque messages framed by a 4-byte big-endian length prefix.
///
/// ```text
/// ┌──────────────┬──────────────────┐
/// │ Length (4B)  │ Payload          │
/// │ big-endian   │ (Length bytes)   │
/// └──────────────┴──────────────────┘
/// ```
#[derive(Debug, Clone)]
pub struct LengthDelimitedCodec {
    max_payload: usize,
}

impl LengthDelimitedCodec {
    /// Create a codec rejecting payloads larger than `max_payload`.
    pub fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }

    /// Largest payload accepted in either direction.
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}

impl Default for LengthDelimitedCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFERED - LENGTH_PREFIX_SIZE)
    }
}

impl MessageDecoder for LengthDelimitedCodec {
    type Message = Bytes;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len > self.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: self.max_payload,
            });
        }

        if src.len() < LENGTH_PREFIX_SIZE + len {
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(src.split_to(len).freeze()))
    }
}

impl MessageEncoder for LengthDelimitedCodec {
    type Message = Bytes;

    fn encode(&mut self, msg: &Bytes, dst: &mut BytesMut) -> Result<()> {
        if msg.len() > self.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: msg.len(),
                max: self.max_payload,
            });
        }
        dst.reserve(LENGTH_PREFIX_SIZE + msg.len());
        dst.put_u32(msg.len() as u32);
        dst.put_slice(msg);
        Ok(())
    }
}

/// Configuration for channel framing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Accumulator cap for incomplete control messages. Default: 256 KiB.
    pub max_buffered: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_buffered: DEFAULT_MAX_BUFFERED,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
