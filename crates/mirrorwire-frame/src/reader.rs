use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use mirrorwire_transport::ChannelStream;
use tracing::trace;

use crate::codec::{FrameConfig, MessageDecoder};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete control messages from any `Read` stream.
///
/// Bytes are accumulated across calls: a message whose prefix has already
/// arrived stays buffered until the rest shows up, and bytes belonging to
/// the next message are kept for the next call.
pub struct ControlReader<T, D> {
    inner: T,
    decoder: D,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read, D: MessageDecoder> ControlReader<T, D> {
    /// Create a reader with default configuration.
    pub fn new(inner: T, decoder: D) -> Self {
        Self::with_config(inner, decoder, FrameConfig::default())
    }

    /// Create a reader with explicit configuration.
    pub fn with_config(inner: T, decoder: D, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Extract one message from already buffered bytes, without reading.
    pub fn try_next(&mut self) -> Result<Option<D::Message>> {
        self.decoder.decode(&mut self.buf)
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when the stream ends,
    /// including in the middle of a message.
    pub fn read_message(&mut self) -> Result<D::Message> {
        loop {
            if let Some(msg) = self.try_next()? {
                return Ok(msg);
            }
            self.fill()?;
        }
    }

    /// Read exactly `len` raw bytes through the accumulator (blocking).
    ///
    /// Used for fixed-size records that precede the message stream.
    pub fn read_fixed(&mut self, len: usize) -> Result<Bytes> {
        while self.buf.len() < len {
            self.fill()?;
        }
        Ok(self.buf.split_to(len).freeze())
    }

    /// Number of bytes buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn fill(&mut self) -> Result<()> {
        let room = self.config.max_buffered.saturating_sub(self.buf.len());
        if room == 0 {
            return Err(FrameError::BufferOverflow {
                buffered: self.buf.len(),
                max: self.config.max_buffered,
            });
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let want = room.min(READ_CHUNK_SIZE);
        loop {
            let read = match self.inner.read(&mut chunk[..want]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
            trace!(read, buffered = self.buf.len(), "control bytes received");
            return Ok(());
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Any buffered bytes are discarded.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<D: MessageDecoder> ControlReader<ChannelStream, D> {
    /// Create a reader for a channel stream and apply the read timeout from config.
    pub fn with_config_stream(
        inner: ChannelStream,
        decoder: D,
        config: FrameConfig,
    ) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(crate::transport_to_frame_error)?;
        Ok(Self::with_config(inner, decoder, config))
    }
}
