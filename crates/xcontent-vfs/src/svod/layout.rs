//! SVOD layout detection
//!
//! The GDF magic block sits at a different offset of fragment 0 depending on
//! how the image was produced. Placements are checked in a fixed order and
//! exactly one layout is selected, or detection fails.

use serde::Serialize;
use std::fmt;
use tracing::{error, info};
use xcontent_formats::SvodVolumeDescriptor;
use xcontent_formats::svod::{MEDIA_MAGIC, XSF_MAGIC};

use crate::{ContainerError, FragmentSet, Result};

/// Magic block offset of the enhanced GDF layout.
pub const EGDF_MAGIC_OFFSET: u64 = 0x2000;
/// Magic block offset of XSF conversions.
pub const XSF_MAGIC_OFFSET: u64 = 0x12000;
/// Offset of the XSF tool header.
pub const XSF_HEADER_OFFSET: u64 = 0x2000;
/// Magic block offset of single-file images.
pub const SINGLE_FILE_MAGIC_OFFSET: u64 = 0xD000;

/// Physical variant of an SVOD image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SvodLayoutKind {
    /// Enhanced GDF: magic at 0x2000, two extra header blocks
    EnhancedGdf,
    /// XSF conversion with its tool header present
    Xsf,
    /// XSF-style placement without the tool header
    XsfUnlabeled,
    /// Whole image in the header file after a 0xB000 byte header
    SingleFile,
}

impl fmt::Display for SvodLayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnhancedGdf => write!(f, "EGDF"),
            Self::Xsf => write!(f, "XSF"),
            Self::XsfUnlabeled => write!(f, "XSF (unlabeled)"),
            Self::SingleFile => write!(f, "single file"),
        }
    }
}

/// Detected layout and the parameters the address translator needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SvodLayout {
    /// Layout variant
    pub kind: SvodLayoutKind,
    /// Bytes preceding the first hash table in fragment 0
    pub base_offset: u64,
    /// Offset of the magic block in fragment 0
    pub magic_offset: u64,
    /// Data start block from the volume descriptor
    pub start_data_block: u32,
}

impl SvodLayout {
    /// Build a layout directly, bypassing detection.
    pub const fn new(kind: SvodLayoutKind, start_data_block: u32) -> Self {
        let (base_offset, magic_offset) = match kind {
            SvodLayoutKind::EnhancedGdf => (0, EGDF_MAGIC_OFFSET),
            SvodLayoutKind::Xsf | SvodLayoutKind::XsfUnlabeled => (0x10000, XSF_MAGIC_OFFSET),
            SvodLayoutKind::SingleFile => (0xB000, SINGLE_FILE_MAGIC_OFFSET),
        };
        Self {
            kind,
            base_offset,
            magic_offset,
            start_data_block,
        }
    }

    /// Look in fragment 0 for the magic block of the volume `descriptor`.
    ///
    /// An EGDF descriptor must have its magic at 0x2000. Otherwise XSF
    /// (0x12000) is tried, then the single-file placement (0xD000), which is
    /// only accepted for a package declaring exactly one data file.
    pub fn detect(
        fragments: &FragmentSet,
        descriptor: &SvodVolumeDescriptor,
        data_file_count: u32,
    ) -> Result<Self> {
        Self::scan(
            fragments,
            descriptor.enhanced_gdf_layout(),
            descriptor.start_data_block(),
            data_file_count,
        )
    }

    fn scan(
        fragments: &FragmentSet,
        enhanced_gdf: bool,
        start: u32,
        data_file_count: u32,
    ) -> Result<Self> {
        if enhanced_gdf {
            let magic = fragments.read(0, EGDF_MAGIC_OFFSET, MEDIA_MAGIC.len())?;
            if magic != MEDIA_MAGIC {
                error!("SVOD uses an EGDF layout, but the magic block was not found");
                return Err(ContainerError::EgdfMagicMissing);
            }
            info!("SVOD uses an EGDF layout, magic block present at 0x{EGDF_MAGIC_OFFSET:X}");
            return Ok(Self::new(SvodLayoutKind::EnhancedGdf, start));
        }

        if has_magic(fragments, XSF_MAGIC_OFFSET, MEDIA_MAGIC) {
            if has_magic(fragments, XSF_HEADER_OFFSET, XSF_MAGIC) {
                info!("SVOD uses an XSF layout, magic block present at 0x{XSF_MAGIC_OFFSET:X}");
                return Ok(Self::new(SvodLayoutKind::Xsf, start));
            }
            info!(
                "SVOD appears to use an XSF layout without a header, magic block present at 0x{XSF_MAGIC_OFFSET:X}"
            );
            return Ok(Self::new(SvodLayoutKind::XsfUnlabeled, start));
        }

        if has_magic(fragments, SINGLE_FILE_MAGIC_OFFSET, MEDIA_MAGIC) {
            if data_file_count == 1 {
                info!(
                    "SVOD is a single file, magic block present at 0x{SINGLE_FILE_MAGIC_OFFSET:X}"
                );
                return Ok(Self::new(SvodLayoutKind::SingleFile, start));
            }
            error!(
                "SVOD magic block found at 0x{SINGLE_FILE_MAGIC_OFFSET:X}, but the package declares {data_file_count} data files"
            );
        } else {
            error!("Could not locate SVOD magic block");
        }
        Err(ContainerError::SvodMagicNotFound)
    }
}

fn has_magic(fragments: &FragmentSet, offset: u64, magic: &[u8]) -> bool {
    fragments
        .read(0, offset, magic.len())
        .is_ok_and(|found| found == magic)
}
