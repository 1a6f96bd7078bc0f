//! Fixed-layout channel headers.
//!
//! Two records are sent before any payload traffic:
//!
//! ```text
//! identity (every channel, 80 bytes)
//! ┌──────────────────────────┬────────────────────┐
//! │ device name (64B, NUL)   │ channel type (16B) │
//! └──────────────────────────┴────────────────────┘
//!
//! device metadata (video only, 68 bytes)
//! ┌──────────────────────────┬────────────┬─────────────┐
//! │ device name (64B, NUL)   │ width u16  │ height u16  │
//! │                          │ (BE)       │ (BE)        │
//! └──────────────────────────┴────────────┴─────────────┘
//! ```
//!
//! Text fields are UTF-8, truncated to at most field length minus one bytes
//! on a code point boundary, then zero padded.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::utf8::utf8_truncation_index;

/// Width of the device name field.
pub const DEVICE_NAME_FIELD_LENGTH: usize = 64;

/// Width of the channel type field.
pub const CHANNEL_TYPE_FIELD_LENGTH: usize = 16;

/// Identity header size: device name + channel type.
pub const IDENTITY_HEADER_SIZE: usize = DEVICE_NAME_FIELD_LENGTH + CHANNEL_TYPE_FIELD_LENGTH;

/// Device metadata size: device name + width + height.
pub const DEVICE_META_SIZE: usize = DEVICE_NAME_FIELD_LENGTH + 4;

/// Which of the two channels a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Video,
    Control,
}

impl ChannelKind {
    /// Tag written into the identity header's channel type field.
    pub fn tag(self) -> &'static str {
        match self {
            ChannelKind::Video => "video",
            ChannelKind::Control => "ctrl",
        }
    }

    /// Parse a channel type tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "video" => Some(ChannelKind::Video),
            "ctrl" => Some(ChannelKind::Control),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Decoded channel identity header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHeader {
    pub device_name: String,
    pub channel_type: String,
}

impl IdentityHeader {
    /// Decode an 80-byte identity header.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() != IDENTITY_HEADER_SIZE {
            return Err(FrameError::InvalidHeader(format!(
                "identity header is {} bytes, expected {IDENTITY_HEADER_SIZE}",
                src.len()
            )));
        }
        Ok(Self {
            device_name: get_text_field(&src[..DEVICE_NAME_FIELD_LENGTH])?,
            channel_type: get_text_field(&src[DEVICE_NAME_FIELD_LENGTH..])?,
        })
    }

    /// The channel type as a known kind, if it is one.
    pub fn kind(&self) -> Option<ChannelKind> {
        ChannelKind::from_tag(&self.channel_type)
    }
}

/// Decoded device metadata header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMeta {
    pub device_name: String,
    pub width: u16,
    pub height: u16,
}

impl DeviceMeta {
    /// Decode a 68-byte device metadata header.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() != DEVICE_META_SIZE {
            return Err(FrameError::InvalidHeader(format!(
                "device metadata is {} bytes, expected {DEVICE_META_SIZE}",
                src.len()
            )));
        }
        let dims = &src[DEVICE_NAME_FIELD_LENGTH..];
        Ok(Self {
            device_name: get_text_field(&src[..DEVICE_NAME_FIELD_LENGTH])?,
            width: u16::from_be_bytes([dims[0], dims[1]]),
            height: u16::from_be_bytes([dims[2], dims[3]]),
        })
    }
}

/// Encode the 80-byte identity header for one channel.
pub fn encode_identity_header(device_name: &str, channel_type: &str) -> Bytes {
    let mut dst = BytesMut::with_capacity(IDENTITY_HEADER_SIZE);
    put_text_field(&mut dst, device_name, DEVICE_NAME_FIELD_LENGTH);
    put_text_field(&mut dst, channel_type, CHANNEL_TYPE_FIELD_LENGTH);
    dst.freeze()
}

/// Encode the 68-byte device metadata header.
pub fn encode_device_meta(device_name: &str, width: u16, height: u16) -> Bytes {
    let mut dst = BytesMut::with_capacity(DEVICE_META_SIZE);
    put_text_field(&mut dst, device_name, DEVICE_NAME_FIELD_LENGTH);
    dst.put_u16(width);
    dst.put_u16(height);
    dst.freeze()
}

fn put_text_field(dst: &mut BytesMut, text: &str, field_len: usize) {
    let bytes = text.as_bytes();
    let len = utf8_truncation_index(bytes, field_len - 1);
    dst.put_slice(&bytes[..len]);
    dst.put_bytes(0, field_len - len);
}

fn get_text_field(field: &[u8]) -> Result<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end])
        .map(str::to_owned)
        .map_err(|err| FrameError::InvalidHeader(format!("text field is not UTF-8: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_header_layout() {
        let header = encode_identity_header("Pixel 7", "video");
        assert_eq!(header.len(), IDENTITY_HEADER_SIZE);
        assert_eq!(&header[..7], b"Pixel 7");
        assert!(header[7..64].iter().all(|&b| b == 0));
        assert_eq!(&header[64..69], b"video");
        assert!(header[69..80].iter().all(|&b| b == 0));
    }

    #[test]
    fn names_up_to_63_bytes_are_copied_verbatim() {
        for len in [0usize, 1, 32, 62, 63] {
            let name = "x".repeat(len);
            let header = encode_identity_header(&name, "ctrl");
            assert_eq!(&header[..len], name.as_bytes());
            assert!(header[len..64].iter().all(|&b| b == 0), "len {len}");
        }
    }

    #[test]
    fn multibyte_name_keeps_field_nul_terminated() {
        let name = "日本語".repeat(8); // 72 bytes
        let header = encode_identity_header(&name, "video");
        // 21 three-byte chars fit in 63 bytes.
        assert_eq!(&header[..63], &name.as_bytes()[..63]);
        assert_eq!(header[63], 0);

        let decoded = IdentityHeader::decode(&header).unwrap();
        assert_eq!(decoded.device_name.chars().count(), 21);
        assert_eq!(decoded.kind(), Some(ChannelKind::Video));
    }

    #[test]
    fn straddling_code_point_is_dropped() {
        let name = format!("{}€{}", "a".repeat(62), "b".repeat(5));
        assert_eq!(name.len(), 70);

        let header = encode_identity_header(&name, "ctrl");
        assert_eq!(&header[..62], "a".repeat(62).as_bytes());
        assert_eq!(header[62], 0);
        assert_eq!(header[63], 0);
    }

    #[test]
    fn long_channel_type_is_truncated() {
        let header = encode_identity_header("dev", "0123456789abcdefXYZ");
        assert_eq!(&header[64..79], b"0123456789abcde");
        assert_eq!(header[79], 0);
    }

    #[test]
    fn device_meta_dimensions_are_big_endian() {
        let meta = encode_device_meta("Pixel", 1920, 1080);
        assert_eq!(meta.len(), DEVICE_META_SIZE);
        assert_eq!(&meta[..5], b"Pixel");
        assert!(meta[5..64].iter().all(|&b| b == 0));
        assert_eq!(&meta[64..68], &[0x07, 0x80, 0x04, 0x38]);
    }

    #[test]
    fn device_meta_decodes() {
        let meta = encode_device_meta("tablet", 2560, 1600);
        let decoded = DeviceMeta::decode(&meta).unwrap();
        assert_eq!(
            decoded,
            DeviceMeta {
                device_name: "tablet".to_string(),
                width: 2560,
                height: 1600,
            }
        );
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let err = IdentityHeader::decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidHeader(_)));
        let err = DeviceMeta::decode(&[0u8; IDENTITY_HEADER_SIZE]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidHeader(_)));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let mut raw = [0u8; IDENTITY_HEADER_SIZE];
        raw[0] = 0xFF;
        raw[1] = 0xFE;
        let err = IdentityHeader::decode(&raw).unwrap_err();
        assert!(matches!(err, FrameError::InvalidHeader(_)));
    }

    #[test]
    fn channel_kind_tags() {
        assert_eq!(ChannelKind::Video.tag(), "video");
        assert_eq!(ChannelKind::Control.tag(), "ctrl");
        assert_eq!(ChannelKind::from_tag("ctrl"), Some(ChannelKind::Control));
        assert_eq!(ChannelKind::from_tag("audio"), None);
    }
}
