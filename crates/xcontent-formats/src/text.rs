//! Entry name decoding
//!
//! Names in both volume formats are single-byte Windows-1252 strings.

use encoding_rs::WINDOWS_1252;

/// Decode a Windows-1252 name to UTF-8.
pub fn decode_cp1252(bytes: &[u8]) -> String {
    WINDOWS_1252
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}
