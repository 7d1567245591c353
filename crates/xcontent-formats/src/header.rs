//! XContent package header and content metadata
//!
//! Every package starts with the same fixed block regardless of volume format:
//!
//! | Offset  | Size   | Field |
//! |---------|--------|-------|
//! | 0x000   | 4      | Magic (`CON `, `LIVE`, `PIRS`) |
//! | 0x004   | 0x228  | Signature |
//! | 0x22C   | 0x100  | License entries |
//! | 0x32C   | 0x14   | Content id |
//! | 0x340   | 4      | Header size (BE) |
//! | 0x344   | 4      | Content type (BE) |
//! | 0x348   | 4      | Metadata version (BE) |
//! | 0x34C   | 8      | Content size (BE) |
//! | 0x354   | 0x18   | Execution info |
//! | 0x36C   | 5      | Console id |
//! | 0x371   | 8      | Profile id (BE) |
//! | 0x379   | 0x24   | Volume descriptor (STFS or SVOD) |
//! | 0x39D   | 4      | Data file count (BE) |
//! | 0x3A1   | 8      | Data file combined size (BE) |
//! | 0x3A9   | 4      | Volume type (BE, 0 = STFS, 1 = SVOD) |
//! | 0x3AD   | 8      | Online creator (BE) |
//! | 0x3B5   | 4      | Category (BE) |
//! | 0x3FD   | 0x14   | Device id |
//! | 0x411   | 0x900  | Display names, UTF-16BE, 9 × 128 chars |
//! | 0xD11   | 0x900  | Descriptions, UTF-16BE, 9 × 128 chars |
//! | 0x1611  | 0x80   | Publisher, UTF-16BE |
//! | 0x1691  | 0x80   | Title name, UTF-16BE |
//! | 0x1711  | 1      | Transfer flags |
//!
//! The whole structure including thumbnails is [`XCONTENT_HEADER_SIZE`] bytes.

use crate::error::{FormatError, Result};
use crate::{XCONTENT_HEADER_SIZE, load_u24_le, slice_at};
use binrw::io::{Cursor, SeekFrom};
use binrw::BinRead;
use serde::Serialize;
use std::fmt;

/// Offset of the volume type tag.
const VOLUME_TYPE_OFFSET: usize = 0x3A9;

/// Package type tag found in the first four bytes of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PackageMagic {
    /// Console-signed package (`CON `)
    Con,
    /// Xbox LIVE-signed package (`LIVE`)
    Live,
    /// Microsoft-signed offline package (`PIRS`)
    Pirs,
}

impl PackageMagic {
    /// Big-endian tag value of `CON `
    pub const CON: u32 = 0x434F_4E20;
    /// Big-endian tag value of `LIVE`
    pub const LIVE: u32 = 0x4C49_5645;
    /// Big-endian tag value of `PIRS`
    pub const PIRS: u32 = 0x5049_5253;

    /// Recognize a magic from the first four bytes of a file.
    pub const fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        match u32::from_be_bytes(bytes) {
            Self::CON => Some(Self::Con),
            Self::LIVE => Some(Self::Live),
            Self::PIRS => Some(Self::Pirs),
            _ => None,
        }
    }

    /// Whether `data` starts with one of the three package magics.
    pub fn matches(data: &[u8]) -> bool {
        data.get(..4)
            .and_then(|m| <[u8; 4]>::try_from(m).ok())
            .and_then(Self::from_bytes)
            .is_some()
    }

    /// Raw tag value.
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Con => Self::CON,
            Self::Live => Self::LIVE,
            Self::Pirs => Self::PIRS,
        }
    }
}

impl TryFrom<u32> for PackageMagic {
    type Error = FormatError;

    fn try_from(value: u32) -> Result<Self> {
        Self::from_bytes(value.to_be_bytes()).ok_or(FormatError::InvalidMagic(value.to_be_bytes()))
    }
}

impl fmt::Display for PackageMagic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Con => write!(f, "CON"),
            Self::Live => write!(f, "LIVE"),
            Self::Pirs => write!(f, "PIRS"),
        }
    }
}

/// Volume format of the package payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VolumeType {
    /// Secure Transacted File System (installed content, profiles)
    Stfs,
    /// Secure Virtual Optical Device (disc images)
    Svod,
}

impl TryFrom<u32> for VolumeType {
    type Error = FormatError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Stfs),
            1 => Ok(Self::Svod),
            other => Err(FormatError::UnknownVolumeType(other)),
        }
    }
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stfs => write!(f, "STFS"),
            Self::Svod => write!(f, "SVOD"),
        }
    }
}

/// STFS volume descriptor (0x24 bytes at header offset 0x379)
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct StfsVolumeDescriptor {
    /// Size of this descriptor, 0x24 for well-formed packages
    pub descriptor_length: u8,
    /// Descriptor version
    pub version: u8,
    /// Bit 0: read-only format, bit 1: root active index,
    /// bit 2: directory over-allocated, bit 3: directory index bounds valid
    pub flags: u8,
    /// Number of blocks in the file table
    pub file_table_block_count: u16,
    file_table_block_number_raw: [u8; 3],
    /// SHA-1 of the top-level hash table
    pub top_hash_table_hash: [u8; 0x14],
    /// Number of allocated blocks in the volume
    #[br(big)]
    pub total_block_count: u32,
    /// Number of free blocks in the volume
    #[br(big)]
    pub free_block_count: u32,
}

impl StfsVolumeDescriptor {
    /// Expected value of `descriptor_length`
    pub const SIZE: u8 = 0x24;

    /// Only one backing block per hash table (no resiliency copy).
    pub const fn read_only_format(&self) -> bool {
        self.flags & 0x01 != 0
    }

    /// The top-level hash table lives in its secondary backing block.
    pub const fn root_active_index(&self) -> bool {
        self.flags & 0x02 != 0
    }

    /// First block of the file table.
    pub const fn file_table_block_number(&self) -> u32 {
        load_u24_le(self.file_table_block_number_raw)
    }

    /// Physical blocks occupied by each hash table: read-only packages keep
    /// one copy, writable ones keep two.
    pub const fn blocks_per_hash_table(&self) -> u32 {
        if self.read_only_format() { 1 } else { 2 }
    }

    /// Whether `descriptor_length` has the expected value.
    pub const fn is_valid(&self) -> bool {
        self.descriptor_length == Self::SIZE
    }
}

/// SVOD device descriptor (0x24 bytes at header offset 0x379)
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct SvodVolumeDescriptor {
    /// Size of this descriptor
    pub descriptor_length: u8,
    /// Block cache element count
    pub block_cache_element_count: u8,
    /// Worker thread processor
    pub worker_thread_processor: u8,
    /// Worker thread priority
    pub worker_thread_priority: u8,
    /// Hash entry of the first fragment
    pub first_fragment_hash_entry: [u8; 0x14],
    /// Feature bits; bit 6 marks the enhanced GDF layout
    pub features: u8,
    num_data_blocks_raw: [u8; 3],
    start_data_block_raw: [u8; 3],
    /// Reserved
    pub reserved: [u8; 5],
}

impl SvodVolumeDescriptor {
    const ENHANCED_GDF_LAYOUT: u8 = 0x40;

    /// The disc uses the enhanced GDF layout (EGDF).
    pub const fn enhanced_gdf_layout(&self) -> bool {
        self.features & Self::ENHANCED_GDF_LAYOUT != 0
    }

    /// Number of data blocks in the volume.
    pub const fn num_data_blocks(&self) -> u32 {
        load_u24_le(self.num_data_blocks_raw)
    }

    /// Block number at which data starts.
    pub const fn start_data_block(&self) -> u32 {
        load_u24_le(self.start_data_block_raw)
    }
}

/// Volume descriptor selected by the header's volume type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(import(volume_type: VolumeType))]
pub enum VolumeDescriptor {
    /// STFS descriptor
    #[br(pre_assert(volume_type == VolumeType::Stfs))]
    Stfs(StfsVolumeDescriptor),
    /// SVOD descriptor
    #[br(pre_assert(volume_type == VolumeType::Svod))]
    Svod(SvodVolumeDescriptor),
}

/// Title execution info embedded in the metadata (0x18 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, Serialize)]
#[br(big)]
pub struct ExecutionInfo {
    /// Media id
    pub media_id: u32,
    /// Title version
    pub version: u32,
    /// Base version
    pub base_version: u32,
    /// Title id
    pub title_id: u32,
    /// Platform
    pub platform: u8,
    /// Executable type
    pub executable_type: u8,
    /// Disc number
    pub disc_number: u8,
    /// Number of discs
    pub disc_count: u8,
}

/// Decoded XContent header and metadata
#[derive(Debug, Clone, BinRead)]
#[br(big)]
pub struct XContentHeader {
    /// Package type
    #[br(try_map = |raw: u32| PackageMagic::from_bytes(raw.to_be_bytes()).ok_or("invalid package magic"))]
    pub magic: PackageMagic,

    /// Content id (header hash)
    #[br(seek_before = SeekFrom::Start(0x32C))]
    pub content_id: [u8; 0x14],

    /// Size of the header; data blocks start at the next 4 KiB boundary
    pub header_size: u32,

    /// Content type
    pub content_type: u32,

    /// Metadata version
    pub metadata_version: u32,

    /// Content size
    pub content_size: u64,

    /// Execution info
    pub execution_info: ExecutionInfo,

    /// Console id
    pub console_id: [u8; 5],

    /// Profile id
    pub profile_id: u64,

    /// Volume type tag
    #[br(
        seek_before = SeekFrom::Start(VOLUME_TYPE_OFFSET as u64),
        try_map = |raw: u32| VolumeType::try_from(raw).map_err(|_| "unknown volume type")
    )]
    pub volume_type: VolumeType,

    /// Volume descriptor matching `volume_type`
    #[br(seek_before = SeekFrom::Start(0x379), args(volume_type))]
    pub volume_descriptor: VolumeDescriptor,

    /// Number of data fragment files (SVOD)
    pub data_file_count: u32,

    /// Combined size of the data fragment files
    pub data_file_size: u64,

    /// Online creator
    #[br(seek_before = SeekFrom::Start(0x3AD))]
    pub online_creator: u64,

    /// Category
    pub category: u32,

    /// Device id
    #[br(seek_before = SeekFrom::Start(0x3FD))]
    pub device_id: [u8; 0x14],

    #[br(seek_before = SeekFrom::Start(0x411))]
    display_name_raw: [u16; 128],

    #[br(seek_before = SeekFrom::Start(0xD11))]
    description_raw: [u16; 128],

    #[br(seek_before = SeekFrom::Start(0x1611))]
    publisher_raw: [u16; 64],

    title_name_raw: [u16; 64],

    /// Transfer flags
    pub transfer_flags: u8,
}

impl XContentHeader {
    /// Parse the fixed header from the start of a package file.
    ///
    /// Fails with [`FormatError::InvalidMagic`] when the file is not an
    /// XContent package and with [`FormatError::UnknownVolumeType`] when the
    /// volume tag is neither STFS nor SVOD.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let magic = slice_at(data, 0, 4)?;
        let magic = [magic[0], magic[1], magic[2], magic[3]];
        if PackageMagic::from_bytes(magic).is_none() {
            return Err(FormatError::InvalidMagic(magic));
        }

        // Copy out the whole fixed structure up front, so a short file fails
        // here rather than somewhere in the middle of the metadata.
        let fixed = slice_at(data, 0, XCONTENT_HEADER_SIZE)?;

        let tag = slice_at(fixed, VOLUME_TYPE_OFFSET, 4)?;
        VolumeType::try_from(u32::from_be_bytes([tag[0], tag[1], tag[2], tag[3]]))?;

        Ok(Self::read(&mut Cursor::new(fixed))?)
    }

    /// STFS descriptor, if this is an STFS package.
    pub const fn stfs_descriptor(&self) -> Option<&StfsVolumeDescriptor> {
        match &self.volume_descriptor {
            VolumeDescriptor::Stfs(descriptor) => Some(descriptor),
            VolumeDescriptor::Svod(_) => None,
        }
    }

    /// SVOD descriptor, if this is an SVOD package.
    pub const fn svod_descriptor(&self) -> Option<&SvodVolumeDescriptor> {
        match &self.volume_descriptor {
            VolumeDescriptor::Svod(descriptor) => Some(descriptor),
            VolumeDescriptor::Stfs(_) => None,
        }
    }

    /// SVOD volumes are always read-only; STFS volumes are when flagged.
    pub const fn is_read_only(&self) -> bool {
        match &self.volume_descriptor {
            VolumeDescriptor::Stfs(descriptor) => descriptor.read_only_format(),
            VolumeDescriptor::Svod(_) => true,
        }
    }

    /// Title id from the execution info.
    pub const fn title_id(&self) -> u32 {
        self.execution_info.title_id
    }

    /// Display name in the first language slot.
    pub fn display_name(&self) -> String {
        decode_utf16(&self.display_name_raw)
    }

    /// Description in the first language slot.
    pub fn description(&self) -> String {
        decode_utf16(&self.description_raw)
    }

    /// Publisher name.
    pub fn publisher(&self) -> String {
        decode_utf16(&self.publisher_raw)
    }

    /// Title name.
    pub fn title_name(&self) -> String {
        decode_utf16(&self.title_name_raw)
    }
}

fn decode_utf16(units: &[u16]) -> String {
    let end = units.iter().position(|&c| c == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}
