//! STFS block address translation
//!
//! Data blocks and hash tables share one physical block space. Starting at the
//! first 4 KiB boundary after the header, the layout of a read-only package
//! (one block per table) looks like:
//!
//! ```text
//! L0[0] d0..d169  L1[0]  L0[1] d170..d339  L0[2] ...
//! ```
//!
//! Writable packages keep two copies of every table, doubling each `L*` slot.

use tracing::error;
use xcontent_formats::StfsVolumeDescriptor;
use xcontent_formats::stfs::{BLOCKS_PER_HASH_LEVEL, STFS_BLOCK_SIZE};

/// Precomputed strides for one package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StfsGeometry {
    data_start: u64,
    blocks_per_hash_table: u32,
    block_step: [u32; 2],
}

impl StfsGeometry {
    /// Derive the geometry from the header size and STFS descriptor.
    pub fn new(header_size: u32, descriptor: &StfsVolumeDescriptor) -> Self {
        Self::with_tables_per_level(header_size, descriptor.blocks_per_hash_table())
    }

    /// Geometry with an explicit number of blocks per hash table (1 or 2).
    pub const fn with_tables_per_level(header_size: u32, blocks_per_hash_table: u32) -> Self {
        let block_size = STFS_BLOCK_SIZE as u64;
        let data_start = (header_size as u64).div_ceil(block_size) * block_size;
        Self {
            data_start,
            blocks_per_hash_table,
            block_step: [
                BLOCKS_PER_HASH_LEVEL[0] + blocks_per_hash_table,
                BLOCKS_PER_HASH_LEVEL[1] + (BLOCKS_PER_HASH_LEVEL[0] + 1) * blocks_per_hash_table,
            ],
        }
    }

    /// Byte offset of the first physical block.
    pub const fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Physical blocks per hash table.
    pub const fn blocks_per_hash_table(&self) -> u32 {
        self.blocks_per_hash_table
    }

    /// Byte offset of logical data block `block` in fragment 0.
    pub fn block_to_offset(&self, block: u32) -> u64 {
        let block = u64::from(block);
        let mut physical = block;
        for &level_base in &BLOCKS_PER_HASH_LEVEL {
            let level_base = u64::from(level_base);
            physical += (block + level_base) / level_base * u64::from(self.blocks_per_hash_table);
            if block < level_base {
                break;
            }
        }
        self.physical_to_offset(physical)
    }

    /// Physical block number of the level `level` hash table covering `block`.
    pub fn hash_block_number(&self, block: u32, level: usize) -> u64 {
        let block = u64::from(block);
        let bpht = u64::from(self.blocks_per_hash_table);
        let step = self.block_step.map(u64::from);

        if level >= 2 {
            return step[1];
        }

        let level_base = u64::from(BLOCKS_PER_HASH_LEVEL[level]);
        if block < level_base {
            return if level == 0 { 0 } else { step[level - 1] };
        }

        let mut number = block / level_base * step[level];
        if level == 0 {
            let level1_base = u64::from(BLOCKS_PER_HASH_LEVEL[1]);
            number += (block / level1_base + 1) * bpht;
            if block < level1_base {
                return number;
            }
        }
        number + bpht
    }

    /// Byte offset of the primary copy of the level `level` hash table
    /// covering `block`.
    pub fn hash_block_offset(&self, block: u32, level: usize) -> u64 {
        self.physical_to_offset(self.hash_block_number(block, level))
    }

    /// Highest hash level present for a volume of `total_block_count` blocks.
    pub fn hash_levels_to_check(total_block_count: u32) -> usize {
        if let Some(level) = BLOCKS_PER_HASH_LEVEL
            .iter()
            .position(|&base| total_block_count < base)
        {
            return level;
        }
        error!("Invalid total block count {total_block_count}, checking hash level 0 only");
        0
    }

    const fn physical_to_offset(&self, physical: u64) -> u64 {
        self.data_start + (physical << 12)
    }
}
