//! STFS hash-table navigation
//!
//! Writable packages keep two copies of every hash table. Which copy is live
//! is decided top down: the volume descriptor picks the copy of the top-level
//! table, and each entry of a level-N table picks the copy of the level N-1
//! table it points at. Read-only packages keep one copy and only need level 0.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;
use xcontent_formats::stfs::{
    BLOCKS_PER_HASH_LEVEL, HASH_ENTRIES_PER_TABLE, STFS_BLOCK_SIZE, StfsHashEntry, StfsHashTable,
};
use xcontent_formats::StfsVolumeDescriptor;

use super::StfsGeometry;
use crate::{ContainerError, FragmentSet, Result};

/// Decode-once cache of STFS hash tables, keyed by absolute byte offset
#[derive(Debug)]
pub struct HashTableCache {
    geometry: StfsGeometry,
    top_level: usize,
    root_active_index: bool,
    tables: HashMap<u64, StfsHashTable>,
}

impl HashTableCache {
    /// Create an empty cache for a package with the given descriptor.
    pub fn new(geometry: StfsGeometry, descriptor: &StfsVolumeDescriptor) -> Self {
        // A read-only package has a single copy of every table, so level 0
        // is authoritative on its own.
        let (top_level, root_active_index) = if descriptor.read_only_format() {
            (0, false)
        } else {
            (
                StfsGeometry::hash_levels_to_check(descriptor.total_block_count),
                descriptor.root_active_index(),
            )
        };

        Self {
            geometry,
            top_level,
            root_active_index,
            tables: HashMap::new(),
        }
    }

    /// Geometry the cache navigates.
    pub const fn geometry(&self) -> &StfsGeometry {
        &self.geometry
    }

    /// Number of tables decoded so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table has been decoded yet.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Level-0 hash entry of data block `block`.
    pub fn block_hash(&mut self, fragments: &FragmentSet, block: u32) -> Result<StfsHashEntry> {
        let mut secondary = self.root_active_index;

        for level in (1..=self.top_level).rev() {
            let record = block / BLOCKS_PER_HASH_LEVEL[level - 1] % HASH_ENTRIES_PER_TABLE as u32;
            let entry = self.entry(fragments, block, level, secondary, record)?;
            secondary = entry.active_index();
        }

        let record = block % BLOCKS_PER_HASH_LEVEL[0];
        self.entry(fragments, block, 0, secondary, record)
    }

    fn entry(
        &mut self,
        fragments: &FragmentSet,
        block: u32,
        level: usize,
        secondary: bool,
        record: u32,
    ) -> Result<StfsHashEntry> {
        let mut offset = self.geometry.hash_block_offset(block, level);
        if secondary {
            offset += STFS_BLOCK_SIZE as u64;
        }

        let table = match self.tables.entry(offset) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                let data = fragments.read(0, offset, STFS_BLOCK_SIZE)?;
                debug!("Decoded level {level} hash table at 0x{offset:08X}");
                slot.insert(StfsHashTable::parse(data)?)
            }
        };

        table
            .entry(record as usize)
            .copied()
            .ok_or(ContainerError::OutOfBounds {
                fragment: 0,
                offset,
                len: STFS_BLOCK_SIZE,
                size: fragments.get(0).map_or(0, <[u8]>::len),
            })
    }
}
