//! Format error types

use thiserror::Error;

/// Errors produced while decoding XContent structures
#[derive(Debug, Error)]
pub enum FormatError {
    /// First four bytes are not a recognized package type
    #[error("invalid package magic: {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Volume type tag is neither STFS nor SVOD
    #[error("unknown volume type: {0}")]
    UnknownVolumeType(u32),

    /// Input ended before a structure could be read
    #[error("truncated data: need {needed} bytes at offset 0x{offset:X}, have {available}")]
    Truncated {
        /// Offset of the attempted read
        offset: usize,
        /// Bytes required
        needed: usize,
        /// Bytes available in the whole input
        available: usize,
    },

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl FormatError {
    /// Whether the error means "this is not the expected kind of file" rather
    /// than "the file could not be read".
    pub const fn is_mismatch(&self) -> bool {
        matches!(self, Self::InvalidMagic(_) | Self::UnknownVolumeType(_))
    }
}

/// Result type for format operations
pub type Result<T> = std::result::Result<T, FormatError>;
