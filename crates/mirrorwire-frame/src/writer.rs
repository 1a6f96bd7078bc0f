use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use mirrorwire_transport::ChannelStream;

use crate::codec::{FrameConfig, MessageEncoder};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Write all of `buf`, retrying short and interrupted writes.
///
/// A write returning zero bytes is reported as `FrameError::ConnectionClosed`.
pub fn write_fully<W: Write + ?Sized>(dst: &mut W, buf: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < buf.len() {
        match dst.write(&buf[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

/// Writes complete device messages to any `Write` stream.
///
/// Each call to [`DeviceWriter::write_message`] puts exactly one encoded
/// message on the wire; nothing is held back between calls.
pub struct DeviceWriter<T, E> {
    inner: T,
    encoder: E,
    buf: BytesMut,
}

impl<T: Write, E: MessageEncoder> DeviceWriter<T, E> {
    /// Create a new device message writer.
    pub fn new(inner: T, encoder: E) -> Self {
        Self {
            inner,
            encoder,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode and send one message (blocking).
    pub fn write_message(&mut self, msg: &E::Message) -> Result<()> {
        self.buf.clear();
        self.encoder.encode(msg, &mut self.buf)?;
        write_fully(&mut self.inner, &self.buf)?;
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<E: MessageEncoder> DeviceWriter<ChannelStream, E> {
    /// Create a writer for a channel stream and apply the write timeout from config.
    pub fn with_config_stream(
        inner: ChannelStream,
        encoder: E,
        config: &FrameConfig,
    ) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(crate::transport_to_frame_error)?;
        Ok(Self::new(inner, encoder))
    }
}
