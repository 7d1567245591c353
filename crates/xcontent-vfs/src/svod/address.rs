//! SVOD block address translation
//!
//! SVOD data blocks are 0x800 bytes. Every 0x198 data blocks are preceded by
//! a 0x1000 byte level-0 hash table, every 0xA1C4 level-0 tables by a level-1
//! table. A fragment file holds at most 0x14388 data blocks (0xA290000
//! bytes including its hash tables).

use super::{SvodLayout, SvodLayoutKind};
use crate::{ContainerError, Result};

/// Size of an SVOD data block.
pub const BLOCK_SIZE: u64 = 0x800;
/// Size of a hash table.
pub const HASH_BLOCK_SIZE: u64 = 0x1000;
/// Data blocks covered by one level-0 table.
pub const BLOCKS_PER_L0_HASH: u64 = 0x198;
/// Level-0 tables covered by one level-1 table.
pub const HASHES_PER_L1_HASH: u64 = 0xA1C4;
/// Data blocks per fragment file.
pub const BLOCKS_PER_FILE: u64 = 0x14388;
/// Size of a full fragment file.
pub const MAX_FILE_SIZE: u64 = 0xA290000;

/// Physical location of a logical block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SvodAddress {
    /// Fragment index
    pub fragment: usize,
    /// Byte offset within the fragment
    pub offset: u64,
}

/// Translate logical block `block` to its fragment and byte offset.
///
/// Pure in `(layout, block)`. Fails only for blocks that precede the data
/// start declared by the volume descriptor.
pub fn block_to_offset(layout: &SvodLayout, block: u64) -> Result<SvodAddress> {
    let start = u64::from(layout.start_data_block) * 2;
    // EGDF images carry two extra header blocks (0x1000 bytes)
    let adjusted = match layout.kind {
        SvodLayoutKind::EnhancedGdf => block + 2,
        _ => block,
    };
    let true_block = adjusted
        .checked_sub(start)
        .ok_or(ContainerError::BlockBeforeDataStart { block, start })?;

    let file_block = true_block % BLOCKS_PER_FILE;
    let mut fragment = true_block / BLOCKS_PER_FILE;

    let level0_tables = file_block / BLOCKS_PER_L0_HASH + 1;
    let level1_tables = level0_tables / HASHES_PER_L1_HASH + 1;
    let mut hash_overhead = (level0_tables + level1_tables) * HASH_BLOCK_SIZE;
    if layout.kind == SvodLayoutKind::SingleFile {
        hash_overhead += layout.base_offset;
    }

    let mut offset = file_block * BLOCK_SIZE + hash_overhead;
    if offset >= MAX_FILE_SIZE {
        fragment += 1;
        offset = offset % MAX_FILE_SIZE + 0x2000;
    }

    Ok(SvodAddress {
        fragment: fragment as usize,
        offset,
    })
}
