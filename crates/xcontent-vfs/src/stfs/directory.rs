//! STFS file-table walk

use tracing::{debug, warn};
use xcontent_formats::stfs::{
    DIRECTORY_RECORD_SIZE, RECORDS_PER_BLOCK, STFS_BLOCK_SIZE, StfsDirectoryRecord,
};
use xcontent_formats::{StfsVolumeDescriptor, decode_cp1252, decode_fat_timestamp};

use super::HashTableCache;
use crate::entry::{BlockExtent, Entry, EntryId, EntryTree};
use crate::{ContainerError, FragmentSet, MountConfig, Result};

const BLOCK_SIZE: u64 = STFS_BLOCK_SIZE as u64;

/// Builds the entry tree of an STFS package from its file table
pub struct StfsDirectoryBuilder<'a> {
    fragments: &'a FragmentSet,
    cache: &'a mut HashTableCache,
    config: &'a MountConfig,
}

impl<'a> StfsDirectoryBuilder<'a> {
    /// Create a builder reading through `cache`.
    pub fn new(
        fragments: &'a FragmentSet,
        cache: &'a mut HashTableCache,
        config: &'a MountConfig,
    ) -> Self {
        Self {
            fragments,
            cache,
            config,
        }
    }

    /// Walk the file table described by `descriptor`.
    ///
    /// Records must name a parent that precedes them in table order; the
    /// file-table chain is followed through the level-0 hash entries. A
    /// record whose parent is a file lands under the root, or fails the
    /// mount in strict mode.
    pub fn build(mut self, descriptor: &StfsVolumeDescriptor) -> Result<EntryTree> {
        let fragments = self.fragments;
        let mut tree = EntryTree::new(0);
        let table_block_count = usize::from(descriptor.file_table_block_count);

        let mut emitted: Vec<EntryId> = Vec::new();
        emitted.try_reserve(table_block_count * RECORDS_PER_BLOCK)?;

        let mut table_block = descriptor.file_table_block_number();
        let mut blocks_read = 0usize;
        while blocks_read < table_block_count {
            let offset = self.cache.geometry().block_to_offset(table_block);
            let data = fragments.read(0, offset, STFS_BLOCK_SIZE)?;
            blocks_read += 1;
            debug!("Reading file table block {table_block} at 0x{offset:08X}");

            for raw in data.chunks_exact(DIRECTORY_RECORD_SIZE) {
                let record = StfsDirectoryRecord::parse(raw)?;
                if record.is_terminator() {
                    break;
                }

                let index = emitted.len();
                let mut parent = match record.parent_index() {
                    None => EntryId::ROOT,
                    Some(parent) if parent < index => emitted[parent],
                    Some(parent) => {
                        return Err(ContainerError::InvalidParent {
                            index,
                            parent,
                            known: index,
                        });
                    }
                };

                let entry = self.read_entry(&record)?;
                if let Some(file) = tree.get(parent).filter(|p| !p.is_directory()) {
                    if self.config.strict_block_chains {
                        return Err(ContainerError::ParentNotDirectory {
                            name: entry.name().to_string(),
                            parent: file.name().to_string(),
                        });
                    }
                    warn!(
                        "Record {index} ({}) names file {} as its parent, attaching it to the root",
                        entry.name(),
                        file.name()
                    );
                    parent = EntryId::ROOT;
                }
                emitted.try_reserve(1)?;
                emitted.push(tree.push(parent, entry)?);
            }

            let hash = self.cache.block_hash(fragments, table_block)?;
            if hash.is_end_of_chain() {
                break;
            }
            table_block = hash.next_block();
        }

        if blocks_read != table_block_count {
            self.anomaly(
                "file table",
                format!("read {blocks_read} blocks, header declares {table_block_count}"),
            )?;
        }

        debug!(
            "Read {} entries from {} file table blocks",
            emitted.len(),
            blocks_read
        );
        Ok(tree)
    }

    fn read_entry(&mut self, record: &StfsDirectoryRecord) -> Result<Entry> {
        let name = decode_cp1252(record.name_bytes());
        let size = u64::from(record.size);
        let create = decode_fat_timestamp(record.create_date, record.create_time);
        let write = decode_fat_timestamp(record.modified_date, record.modified_time);

        let entry = if record.is_directory() {
            Entry::directory(name)
        } else {
            let extents = self.walk_chain(&name, record)?;
            Entry::file(name, extents)
        };

        Ok(entry
            .with_size(size, size.div_ceil(BLOCK_SIZE) * BLOCK_SIZE)
            .with_timestamps(create, write, write))
    }

    /// Follow the block chain of a file, one extent per block.
    ///
    /// Stops at the end-of-chain marker, once the declared size is covered,
    /// or after `allocated + 1` blocks, whichever comes first.
    fn walk_chain(&mut self, name: &str, record: &StfsDirectoryRecord) -> Result<Vec<BlockExtent>> {
        let allocated = record.allocated_data_blocks() as usize;
        let max_steps = allocated + 1;
        let mut remaining = u64::from(record.size);

        let mut extents = Vec::new();
        extents.try_reserve(remaining.div_ceil(BLOCK_SIZE).min(max_steps as u64) as usize)?;

        let mut block = record.start_block();
        while remaining > 0 && extents.len() < max_steps {
            let length = remaining.min(BLOCK_SIZE);
            extents.push(BlockExtent {
                fragment: 0,
                offset: self.cache.geometry().block_to_offset(block),
                length,
            });
            remaining -= length;
            if remaining == 0 {
                break;
            }

            let hash = self.cache.block_hash(self.fragments, block)?;
            if hash.is_end_of_chain() {
                break;
            }
            block = hash.next_block();
        }

        if remaining > 0 {
            let size = u64::from(record.size);
            self.anomaly(
                name,
                format!(
                    "found {} of {size} bytes ({remaining} bytes missing)",
                    size - remaining
                ),
            )?;
        }
        if extents.len() != allocated {
            self.anomaly(
                name,
                format!("read {} blocks, expected {allocated}", extents.len()),
            )?;
        }

        Ok(extents)
    }

    fn anomaly(&self, name: &str, reason: String) -> Result<()> {
        if self.config.strict_block_chains {
            return Err(ContainerError::BrokenChain {
                name: name.to_string(),
                reason,
            });
        }
        warn!("Block chain of {name}: {reason}");
        Ok(())
    }
}
