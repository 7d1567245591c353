//! On-disk structures of Xbox 360 XContent packages
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::doc_markdown)] // Many XContent-specific terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
//! XContent packages wrap installed content, profiles and disc images in one of
//! two volume formats. This crate decodes the fixed structures of both; the
//! mounting logic that walks them lives in `xcontent-vfs`.
//!
//! # Supported Structures
//!
//! - **Header**: package magic (`CON `, `LIVE`, `PIRS`), signature area,
//!   content metadata and the per-volume descriptor
//! - **STFS**: hash entries, 4 KiB hash tables and 64-byte directory records
//! - **SVOD**: the `MICROSOFT*XBOX*MEDIA` magic block and GDF directory records
//! - **Timestamps**: packed FAT date/time pairs decoded to Windows ticks
//!
//! All parsers work on borrowed byte slices and validate lengths before
//! reading, so truncated or hostile inputs produce errors instead of panics.

#![warn(missing_docs)]

pub mod error;
pub mod header;
pub mod stfs;
pub mod svod;
pub mod text;
pub mod timestamp;

pub use error::{FormatError, Result};
pub use header::{
    ExecutionInfo, PackageMagic, StfsVolumeDescriptor, SvodVolumeDescriptor, VolumeDescriptor,
    VolumeType, XContentHeader,
};
pub use text::decode_cp1252;
pub use timestamp::{decode_fat_timestamp, ticks_to_datetime};

/// Size of the fixed XContent header structure (header plus metadata).
pub const XCONTENT_HEADER_SIZE: usize = 0x971A;

/// Read a 24-bit little-endian integer.
#[inline]
pub const fn load_u24_le(bytes: [u8; 3]) -> u32 {
    (bytes[2] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[0] as u32
}

/// Borrow `len` bytes at `offset`, failing instead of panicking when the slice
/// is too short.
pub fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(FormatError::Truncated {
            offset,
            needed: len,
            available: data.len(),
        })
}
