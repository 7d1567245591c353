//! SVOD (GDF) magic block and directory records
//!
//! SVOD volumes carry a GDF file system. Its volume descriptor starts with the
//! 20-byte `MICROSOFT*XBOX*MEDIA` magic, followed by the root directory
//! location. Directories are binary trees of variable-length records
//! addressed by ordinal (4-byte units from the start of the directory).

use crate::error::Result;
use crate::slice_at;
use binrw::BinRead;
use binrw::io::Cursor;

/// Magic string opening the GDF volume descriptor.
pub const MEDIA_MAGIC: &[u8; 20] = b"MICROSOFT*XBOX*MEDIA";

/// Header written by XSF conversion tools at offset 0x2000.
pub const XSF_MAGIC: &[u8; 3] = b"XSF";

/// Size of an SVOD data block in bytes.
pub const SVOD_BLOCK_SIZE: usize = 0x800;

/// Size of the fixed part of a directory record.
pub const DIRECTORY_RECORD_HEADER_SIZE: usize = 0xE;

/// Directory attribute bit.
pub const ATTRIBUTE_DIRECTORY: u8 = 0x10;

/// Root directory fields following the magic (offset 0x14 of the magic block)
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct SvodRootDescriptor {
    /// Block holding the root directory
    pub block: u32,
    /// Size of the root directory in bytes
    pub size: u32,
    /// FAT date of creation
    pub creation_date: u32,
    /// FAT time of creation
    pub creation_time: u32,
}

impl SvodRootDescriptor {
    /// Offset of the root fields within the magic block.
    pub const OFFSET: usize = 0x14;

    /// Decode the root fields of the magic block starting at `data[0]`.
    pub fn parse(magic_block: &[u8]) -> Result<Self> {
        let fields = slice_at(magic_block, Self::OFFSET, 0x10)?;
        Ok(Self::read(&mut Cursor::new(fields))?)
    }
}

/// One directory record: 14-byte header plus name
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct SvodDirectoryRecord {
    /// Ordinal of the left sibling, 0 for none
    pub node_l: u16,
    /// Ordinal of the right sibling, 0 for none
    pub node_r: u16,
    /// First block of the content, or of the child directory
    pub data_block: u32,
    /// Content length in bytes; for directories nonzero means "has children"
    pub length: u32,
    /// GDF attribute bits
    pub attributes: u8,
    /// Name length in bytes
    pub name_length: u8,
    /// Raw name bytes
    #[br(count = name_length)]
    pub name: Vec<u8>,
}

impl SvodDirectoryRecord {
    /// Decode a record from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = slice_at(data, 0, DIRECTORY_RECORD_HEADER_SIZE)?;
        let name_length = usize::from(header[DIRECTORY_RECORD_HEADER_SIZE - 1]);
        let record = slice_at(data, 0, DIRECTORY_RECORD_HEADER_SIZE + name_length)?;
        Ok(Self::read(&mut Cursor::new(record))?)
    }

    /// Total on-disk size of the record.
    pub fn encoded_len(&self) -> usize {
        DIRECTORY_RECORD_HEADER_SIZE + self.name.len()
    }

    /// Whether the record describes a directory.
    pub const fn is_directory(&self) -> bool {
        self.attributes & ATTRIBUTE_DIRECTORY != 0
    }
}

/// Whether `data` starts with [`MEDIA_MAGIC`].
pub fn is_media_magic(data: &[u8]) -> bool {
    data.starts_with(MEDIA_MAGIC)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_root_descriptor() {
        let mut block = vec![0u8; 0x800];
        block[..20].copy_from_slice(MEDIA_MAGIC);
        block[0x14..0x18].copy_from_slice(&0x24u32.to_le_bytes());
        block[0x18..0x1C].copy_from_slice(&0x800u32.to_le_bytes());
        block[0x1C..0x20].copy_from_slice(&0x3C8Fu32.to_le_bytes());
        block[0x20..0x24].copy_from_slice(&0x6000u32.to_le_bytes());

        assert!(is_media_magic(&block));
        let root = SvodRootDescriptor::parse(&block).unwrap();
        assert_eq!(root.block, 0x24);
        assert_eq!(root.size, 0x800);
        assert_eq!(root.creation_date, 0x3C8F);
        assert_eq!(root.creation_time, 0x6000);
    }

    #[test]
    fn test_directory_record() {
        let mut data = vec![0u8; 32];
        data[0..2].copy_from_slice(&3u16.to_le_bytes());
        data[2..4].copy_from_slice(&0u16.to_le_bytes());
        data[4..8].copy_from_slice(&0x40u32.to_le_bytes());
        data[8..12].copy_from_slice(&1234u32.to_le_bytes());
        data[12] = 0x80;
        data[13] = 11;
        data[14..25].copy_from_slice(b"default.xex");

        let record = SvodDirectoryRecord::parse(&data).unwrap();
        assert_eq!(record.node_l, 3);
        assert_eq!(record.node_r, 0);
        assert_eq!(record.data_block, 0x40);
        assert_eq!(record.length, 1234);
        assert!(!record.is_directory());
        assert_eq!(record.name, b"default.xex");
        assert_eq!(record.encoded_len(), 25);
    }

    #[test]
    fn test_record_name_past_end_rejected() {
        let mut data = vec![0u8; 16];
        data[12] = ATTRIBUTE_DIRECTORY;
        data[13] = 10;
        assert!(SvodDirectoryRecord::parse(&data).is_err());
        assert!(SvodDirectoryRecord::parse(&data[..10]).is_err());
    }
}
