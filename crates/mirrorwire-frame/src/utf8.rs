//! UTF-8 safe truncation for fixed-width text fields.

/// Largest prefix length of `utf8` that is at most `max_len` bytes and does
/// not end inside a multi-byte sequence.
///
/// If the input already fits it is returned whole. Otherwise the cut starts
/// at `max_len` and moves back while the byte at the cut is a continuation
/// byte (`0b10xx_xxxx`), so the byte after the cut always starts a new code
/// point.
pub fn utf8_truncation_index(utf8: &[u8], max_len: usize) -> usize {
    if utf8.len() <= max_len {
        return utf8.len();
    }
    let mut len = max_len;
    while len > 0 && is_continuation(utf8[len]) {
        len -= 1;
    }
    len
}

/// Truncate `text` to at most `max_len` bytes on a code point boundary.
pub fn truncate_utf8(text: &str, max_len: usize) -> &str {
    let len = utf8_truncation_index(text.as_bytes(), max_len);
    &text[..len]
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}
