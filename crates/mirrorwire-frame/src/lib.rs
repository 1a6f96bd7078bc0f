//! Channel headers and control-message framing for mirrorwire.
//!
//! Every channel starts with a fixed 80-byte identity header; the video
//! channel additionally carries a 68-byte device metadata header. After
//! that, the control channel carries messages whose wire format belongs to
//! a [`MessageDecoder`] / [`MessageEncoder`] pair. This crate only
//! guarantees message boundaries:
//! - [`ControlReader`] accumulates bytes and yields one complete message at a time
//! - [`DeviceWriter`] pushes one encoded message fully per call

pub mod codec;
pub mod error;
pub mod header;
pub mod reader;
pub mod utf8;
pub mod writer;

pub use codec::{
    FrameConfig, LengthDelimitedCodec, MessageDecoder, MessageEncoder, DEFAULT_MAX_BUFFERED,
    LENGTH_PREFIX_SIZE,
};
pub use error::{FrameError, Result};
pub use header::{
    encode_device_meta, encode_identity_header, ChannelKind, DeviceMeta, IdentityHeader,
    CHANNEL_TYPE_FIELD_LENGTH, DEVICE_META_SIZE, DEVICE_NAME_FIELD_LENGTH, IDENTITY_HEADER_SIZE,
};
pub use reader::ControlReader;
pub use utf8::{truncate_utf8, utf8_truncation_index};
pub use writer::{write_fully, DeviceWriter};

pub(crate) fn transport_to_frame_error(err: mirrorwire_transport::TransportError) -> FrameError {
    use mirrorwire_transport::TransportError;

    match err {
        TransportError::Io(io) | TransportError::Accept(io) => FrameError::Io(io),
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            FrameError::Io(source)
        }
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
