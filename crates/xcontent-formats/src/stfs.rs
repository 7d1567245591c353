//! STFS hash tables and directory records
//!
//! STFS stores data in 4 KiB blocks. Every group of 170 data blocks is
//! preceded by a level-0 hash table; every 170 level-0 tables by a level-1
//! table, and every 170 level-1 tables by a level-2 table. Each hash entry
//! carries the SHA-1 of the block it covers plus a 32-bit info word:
//!
//! ```text
//! level 0:  [31:30] allocation state   [23:0] next block in chain
//! level N:  [31] writeable  [30] active index  [29:15] unknown  [14:0] free
//! ```
//!
//! The file table is a chain of blocks holding 64 directory records each.

use crate::error::Result;
use crate::{load_u24_le, slice_at};
use binrw::BinRead;
use binrw::io::Cursor;

/// Size of an STFS block in bytes.
pub const STFS_BLOCK_SIZE: usize = 0x1000;

/// Hash entries per hash table.
pub const HASH_ENTRIES_PER_TABLE: usize = 170;

/// Data blocks covered by one table at each hash level.
pub const BLOCKS_PER_HASH_LEVEL: [u32; 3] = [170, 28_900, 4_913_000];

/// Number of hash levels.
pub const HASH_LEVEL_COUNT: usize = 3;

/// Next-block value terminating a block chain.
pub const END_OF_CHAIN: u32 = 0x00FF_FFFF;

/// Size of a directory record in bytes.
pub const DIRECTORY_RECORD_SIZE: usize = 0x40;

/// Directory records per file-table block.
pub const RECORDS_PER_BLOCK: usize = STFS_BLOCK_SIZE / DIRECTORY_RECORD_SIZE;

/// `path_indicator` value meaning "parent is the root directory".
pub const ROOT_PATH_INDICATOR: u16 = 0xFFFF;

/// Allocation state of a level-0 hash entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashState {
    /// Unallocated, not present in the package
    Free,
    /// Unallocated, present in the package
    Free2,
    /// In use
    InUse,
    /// Reserved encoding
    Unknown,
}

/// One 0x18-byte hash entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct StfsHashEntry {
    /// SHA-1 of the covered block
    pub sha1: [u8; 0x14],
    /// Packed info word
    pub info: u32,
}

impl StfsHashEntry {
    /// Next block in the data chain (level-0 entries).
    pub const fn next_block(&self) -> u32 {
        self.info & 0x00FF_FFFF
    }

    /// Whether the chain ends at this block.
    pub const fn is_end_of_chain(&self) -> bool {
        self.next_block() == END_OF_CHAIN
    }

    /// Allocation state (level-0 entries).
    pub const fn allocation_state(&self) -> HashState {
        match (self.info >> 30) & 0x3 {
            0 => HashState::Free,
            1 => HashState::Free2,
            2 => HashState::InUse,
            _ => HashState::Unknown,
        }
    }

    /// Which of the two backing copies of the next-lower table is
    /// authoritative (level 1 and 2 entries).
    pub const fn active_index(&self) -> bool {
        self.info & 0x4000_0000 != 0
    }

    /// Free blocks below this entry (level 1 and 2 entries).
    pub const fn free_block_count(&self) -> u32 {
        self.info & 0x7FFF
    }
}

/// One 4 KiB hash table
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct StfsHashTable {
    /// Hash entries, one per covered block or table
    pub entries: [StfsHashEntry; HASH_ENTRIES_PER_TABLE],
    /// Number of blocks covered by this table
    pub num_blocks: u32,
}

impl StfsHashTable {
    /// Decode a table from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let block = slice_at(data, 0, STFS_BLOCK_SIZE)?;
        Ok(Self::read(&mut Cursor::new(block))?)
    }

    /// Entry for `record`, which must be below [`HASH_ENTRIES_PER_TABLE`].
    pub fn entry(&self, record: usize) -> Option<&StfsHashEntry> {
        self.entries.get(record)
    }
}

/// One 64-byte file-table record
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0x00   | 40   | Name |
/// | 0x28   | 1    | Name length (bits 0-5), contiguous (bit 6), directory (bit 7) |
/// | 0x29   | 3    | Valid data blocks (LE) |
/// | 0x2C   | 3    | Allocated data blocks (LE) |
/// | 0x2F   | 3    | Start block (LE) |
/// | 0x32   | 2    | Path indicator (BE) |
/// | 0x34   | 4    | Size (BE) |
/// | 0x38   | 2+2  | Create date/time (BE) |
/// | 0x3C   | 2+2  | Modified date/time (BE) |
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct StfsDirectoryRecord {
    /// Raw name bytes, Windows-1252, not NUL-terminated
    pub name: [u8; 40],
    /// Name length and flags
    pub flags: u8,
    valid_data_blocks_raw: [u8; 3],
    allocated_data_blocks_raw: [u8; 3],
    start_block_raw: [u8; 3],
    /// Index of the parent record, or [`ROOT_PATH_INDICATOR`]
    pub path_indicator: u16,
    /// File size in bytes
    pub size: u32,
    /// FAT date of creation
    pub create_date: u16,
    /// FAT time of creation
    pub create_time: u16,
    /// FAT date of last modification
    pub modified_date: u16,
    /// FAT time of last modification
    pub modified_time: u16,
}

impl StfsDirectoryRecord {
    /// Decode a record from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let record = slice_at(data, 0, DIRECTORY_RECORD_SIZE)?;
        Ok(Self::read(&mut Cursor::new(record))?)
    }

    /// A zero first name byte terminates the records of a block.
    pub const fn is_terminator(&self) -> bool {
        self.name[0] == 0
    }

    /// Raw name bytes, truncated to the declared length.
    pub fn name_bytes(&self) -> &[u8] {
        let len = usize::from(self.flags & 0x3F).min(self.name.len());
        &self.name[..len]
    }

    /// Whether the record describes a directory.
    pub const fn is_directory(&self) -> bool {
        self.flags & 0x80 != 0
    }

    /// Whether the data blocks are physically contiguous.
    pub const fn is_contiguous(&self) -> bool {
        self.flags & 0x40 != 0
    }

    /// Blocks holding valid data.
    pub const fn valid_data_blocks(&self) -> u32 {
        load_u24_le(self.valid_data_blocks_raw)
    }

    /// Blocks allocated to the file.
    pub const fn allocated_data_blocks(&self) -> u32 {
        load_u24_le(self.allocated_data_blocks_raw)
    }

    /// First block of the data chain.
    pub const fn start_block(&self) -> u32 {
        load_u24_le(self.start_block_raw)
    }

    /// Parent record index, `None` when the parent is the root.
    pub const fn parent_index(&self) -> Option<usize> {
        if self.path_indicator == ROOT_PATH_INDICATOR {
            None
        } else {
            Some(self.path_indicator as usize)
        }
    }
}
