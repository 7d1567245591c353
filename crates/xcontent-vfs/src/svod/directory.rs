//! SVOD directory walk
//!
//! Each GDF directory is a binary tree of records addressed by ordinal. The
//! walk is in-order (left subtree, record, right subtree), which fixes the
//! order of children. It runs on an explicit work stack and is bounded by
//! [`MountConfig::max_directory_nodes`], so cyclic or very deep trees end in
//! an error instead of exhausting the stack.

use tracing::{debug, error};
use xcontent_formats::svod::{SvodDirectoryRecord, SvodRootDescriptor};
use xcontent_formats::{decode_cp1252, decode_fat_timestamp};

use super::address::{BLOCK_SIZE, block_to_offset};
use super::SvodLayout;
use crate::entry::{BlockExtent, Entry, EntryId, EntryTree};
use crate::{ContainerError, FragmentSet, MountConfig, Result};

/// Allocation unit reported for SVOD files.
const ALLOCATION_UNIT: u64 = 0x1000;

enum Work {
    /// Read the record at `ordinal` of the directory starting at `block`
    Visit {
        block: u64,
        ordinal: u16,
        parent: EntryId,
    },
    /// Add a record already read to its parent
    Emit {
        record: SvodDirectoryRecord,
        parent: EntryId,
    },
}

/// Builds the entry tree of an SVOD image from its GDF directories
pub struct SvodDirectoryBuilder<'a> {
    fragments: &'a FragmentSet,
    layout: &'a SvodLayout,
    config: &'a MountConfig,
}

impl<'a> SvodDirectoryBuilder<'a> {
    /// Create a builder for an image with the detected `layout`.
    pub const fn new(
        fragments: &'a FragmentSet,
        layout: &'a SvodLayout,
        config: &'a MountConfig,
    ) -> Self {
        Self {
            fragments,
            layout,
            config,
        }
    }

    /// Read the root descriptor from the magic block and walk the tree.
    ///
    /// Every entry takes the root directory's creation time; GDF records have
    /// no timestamps of their own.
    pub fn build(&self) -> Result<EntryTree> {
        let magic_block = self.fragments.tail(0, self.layout.magic_offset)?;
        let root = SvodRootDescriptor::parse(magic_block)?;
        let timestamp =
            decode_fat_timestamp(root.creation_date as u16, root.creation_time as u16);
        debug!(
            "SVOD root directory at block {} ({} bytes)",
            root.block, root.size
        );

        let mut tree = EntryTree::new(timestamp);
        let mut stack = vec![Work::Visit {
            block: u64::from(root.block),
            ordinal: 0,
            parent: EntryId::ROOT,
        }];
        let mut visited = 0usize;

        while let Some(work) = stack.pop() {
            match work {
                Work::Visit {
                    block,
                    ordinal,
                    parent,
                } => {
                    visited += 1;
                    if visited > self.config.max_directory_nodes {
                        error!(
                            "SVOD directory walk exceeded {} nodes",
                            self.config.max_directory_nodes
                        );
                        return Err(ContainerError::TraversalLimit(
                            self.config.max_directory_nodes,
                        ));
                    }

                    let record = self.read_record(block, ordinal)?;
                    stack.try_reserve(3)?;
                    if record.node_r != 0 {
                        stack.push(Work::Visit {
                            block,
                            ordinal: record.node_r,
                            parent,
                        });
                    }
                    let node_l = record.node_l;
                    stack.push(Work::Emit { record, parent });
                    if node_l != 0 {
                        stack.push(Work::Visit {
                            block,
                            ordinal: node_l,
                            parent,
                        });
                    }
                }
                Work::Emit { record, parent } => {
                    let name = decode_cp1252(&record.name);
                    if record.is_directory() {
                        let entry = Entry::directory(name)
                            .with_timestamps(timestamp, timestamp, timestamp);
                        let id = tree.push(parent, entry)?;
                        if record.length != 0 {
                            stack.try_reserve(1)?;
                            stack.push(Work::Visit {
                                block: u64::from(record.data_block),
                                ordinal: 0,
                                parent: id,
                            });
                        }
                    } else {
                        let size = u64::from(record.length);
                        let extents = self.file_extents(record.data_block, size)?;
                        let entry = Entry::file(name, extents)
                            .with_size(size, size.div_ceil(ALLOCATION_UNIT) * ALLOCATION_UNIT)
                            .with_timestamps(timestamp, timestamp, timestamp);
                        tree.push(parent, entry)?;
                    }
                }
            }
        }

        debug!("Visited {visited} SVOD directory records");
        Ok(tree)
    }

    /// Read the record `ordinal` of the directory at `block`. The ordinal
    /// offset may run past the first block of the directory.
    fn read_record(&self, block: u64, ordinal: u16) -> Result<SvodDirectoryRecord> {
        let ordinal_offset = u64::from(ordinal) * 4;
        let address = block_to_offset(self.layout, block + ordinal_offset / BLOCK_SIZE)?;
        let data = self
            .fragments
            .tail(address.fragment, address.offset + ordinal_offset % BLOCK_SIZE)?;
        Ok(SvodDirectoryRecord::parse(data)?)
    }

    /// Translate consecutive blocks starting at `first_block`, merging
    /// physically adjacent blocks into one extent.
    fn file_extents(&self, first_block: u32, size: u64) -> Result<Vec<BlockExtent>> {
        let mut extents: Vec<BlockExtent> = Vec::new();
        let mut block = u64::from(first_block);
        let mut remaining = size;

        while remaining > 0 {
            let address = block_to_offset(self.layout, block)?;
            let length = remaining.min(BLOCK_SIZE);
            block += 1;
            remaining -= length;

            if let Some(last) = extents.last_mut()
                && last.fragment == address.fragment
                && last.offset + last.length == address.offset
            {
                last.length += length;
                continue;
            }

            extents.try_reserve(1)?;
            extents.push(BlockExtent {
                fragment: address.fragment,
                offset: address.offset,
                length,
            });
        }

        Ok(extents)
    }
}
