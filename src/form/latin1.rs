//! Single-byte-per-character text, the way multipart bodies arrive on the wire.
//!
//! Decoding never fails and encoding a decoded string gives back the exact
//! original bytes, so a browser's UTF-8 field value survives the round trip
//! into the outgoing email untouched.

/// Maps every byte to the char with the same code point.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`decode`]. Chars above U+00FF become `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
