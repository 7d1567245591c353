//! Synthetic package builders shared by the integration tests

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_truncation)]

use std::path::{Path, PathBuf};

pub const HEADER_SIZE: u32 = 0x971A;
pub const DATA_START: usize = 0xA000;
pub const BLOCK: usize = 0x1000;
pub const END_OF_CHAIN: u32 = 0x00FF_FFFF;

/// Ticks of 1980-01-01 00:00:00, the FAT epoch
pub const FAT_EPOCH_TICKS: u64 = 119_600_064_000_000_000;
/// FAT date 2025-01-01
pub const MODIFIED_DATE: u16 = (45 << 9) | (1 << 5) | 1;
/// FAT time 12:30:10
pub const MODIFIED_TIME: u16 = (12 << 11) | (30 << 5) | 5;

fn ensure_len(data: &mut Vec<u8>, len: usize) {
    if data.len() < len {
        data.resize(len, 0);
    }
}

/// Write `bytes` at `offset`, growing `data` as needed
pub fn write_at(data: &mut Vec<u8>, offset: usize, bytes: &[u8]) {
    ensure_len(data, offset + bytes.len());
    data[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// Fixed XContent header with the volume tag and data file count set
pub fn xcontent_header(magic: &[u8; 4], volume_type: u32, data_file_count: u32) -> Vec<u8> {
    let mut data = vec![0u8; DATA_START];
    data[0..4].copy_from_slice(magic);
    data[0x340..0x344].copy_from_slice(&HEADER_SIZE.to_be_bytes());
    data[0x344..0x348].copy_from_slice(&0x0000_0002u32.to_be_bytes());
    data[0x360..0x364].copy_from_slice(&0x4D53_0830u32.to_be_bytes());
    data[0x379] = 0x24;
    data[0x39D..0x3A1].copy_from_slice(&data_file_count.to_be_bytes());
    data[0x3A9..0x3AD].copy_from_slice(&volume_type.to_be_bytes());
    for (i, c) in "Synthetic Package".encode_utf16().enumerate() {
        data[0x411 + i * 2..0x413 + i * 2].copy_from_slice(&c.to_be_bytes());
    }
    data
}

/// Write `bytes` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Deterministic file content
pub fn pattern(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

// STFS

/// One 64-byte STFS directory record
pub fn stfs_record(
    name: &str,
    directory: bool,
    start_block: u32,
    blocks: u32,
    parent: u16,
    size: u32,
) -> [u8; 64] {
    let mut record = [0u8; 64];
    record[..name.len()].copy_from_slice(name.as_bytes());
    record[0x28] = name.len() as u8 | if directory { 0x80 } else { 0x40 };
    record[0x29..0x2C].copy_from_slice(&blocks.to_le_bytes()[..3]);
    record[0x2C..0x2F].copy_from_slice(&blocks.to_le_bytes()[..3]);
    record[0x2F..0x32].copy_from_slice(&start_block.to_le_bytes()[..3]);
    record[0x32..0x34].copy_from_slice(&parent.to_be_bytes());
    record[0x34..0x38].copy_from_slice(&size.to_be_bytes());
    record[0x38..0x3A].copy_from_slice(&0x0021u16.to_be_bytes());
    record[0x3A..0x3C].copy_from_slice(&0u16.to_be_bytes());
    record[0x3C..0x3E].copy_from_slice(&MODIFIED_DATE.to_be_bytes());
    record[0x3E..0x40].copy_from_slice(&MODIFIED_TIME.to_be_bytes());
    record
}

/// Raw STFS image with explicit control over hash tables
///
/// Only volumes below 28900 blocks are supported (one level-1 table).
pub struct StfsImage {
    pub data: Vec<u8>,
    read_only: bool,
    root_active_index: bool,
    level0_secondary: bool,
    total_block_count: u32,
}

impl StfsImage {
    pub fn new(read_only: bool, total_block_count: u32) -> Self {
        Self {
            data: xcontent_header(b"LIVE", 0, 0),
            read_only,
            root_active_index: false,
            level0_secondary: false,
            total_block_count,
        }
    }

    /// Writable images only: put the live top-level table in its second slot
    pub fn root_active_index(mut self, secondary: bool) -> Self {
        self.root_active_index = secondary;
        self
    }

    /// Writable images with a level-1 table: put every live level-0 table in
    /// its second slot
    pub fn level0_secondary(mut self, secondary: bool) -> Self {
        self.level0_secondary = secondary;
        self
    }

    fn tables_per_level(&self) -> usize {
        if self.read_only { 1 } else { 2 }
    }

    /// Physical block of data block `block`
    pub fn data_physical(&self, block: u32) -> usize {
        let block = block as usize;
        let bpht = self.tables_per_level();
        let level1 = if block >= 170 { bpht } else { 0 };
        block + (block / 170 + 1) * bpht + level1
    }

    /// Physical block of the primary copy of the level-0 table of `block`
    pub fn level0_physical(&self, block: u32) -> usize {
        let block = block as usize;
        let bpht = self.tables_per_level();
        if block < 170 {
            0
        } else {
            block / 170 * (170 + bpht) + bpht
        }
    }

    /// Physical block of the primary copy of the level-1 table
    pub fn level1_physical(&self) -> usize {
        170 + self.tables_per_level()
    }

    pub fn data_offset(&self, block: u32) -> usize {
        DATA_START + self.data_physical(block) * BLOCK
    }

    fn has_level1(&self) -> bool {
        !self.read_only && self.total_block_count >= 170
    }

    fn live_level0_offset(&self, block: u32) -> usize {
        let secondary = if self.read_only {
            false
        } else if self.has_level1() {
            self.level0_secondary
        } else {
            self.root_active_index
        };
        DATA_START + (self.level0_physical(block) + usize::from(secondary)) * BLOCK
    }

    /// Set the chain link of data block `block`
    pub fn set_next(&mut self, block: u32, next: u32) {
        let table = self.live_level0_offset(block);
        ensure_len(&mut self.data, table + BLOCK);
        let info = 0x8000_0000 | next;
        write_at(&mut self.data, table + (block as usize % 170) * 0x18 + 0x14, &info.to_be_bytes());
    }

    /// Chain `blocks` in order, terminating the last one
    pub fn chain(&mut self, blocks: &[u32]) {
        for pair in blocks.windows(2) {
            self.set_next(pair[0], pair[1]);
        }
        if let Some(&last) = blocks.last() {
            self.set_next(last, END_OF_CHAIN);
        }
    }

    pub fn write_block(&mut self, block: u32, bytes: &[u8]) {
        assert!(bytes.len() <= BLOCK);
        let mut padded = bytes.to_vec();
        padded.resize(BLOCK, 0);
        let offset = self.data_offset(block);
        write_at(&mut self.data, offset, &padded);
    }

    /// Finish the image with a file table of `table_blocks` blocks starting
    /// at `first_table_block`
    pub fn finish(mut self, first_table_block: u32, table_blocks: u16) -> Vec<u8> {
        let mut flags = 0u8;
        if self.read_only {
            flags |= 0x01;
        }
        if self.root_active_index {
            flags |= 0x02;
        }

        if self.has_level1() {
            let live_l1 = usize::from(self.root_active_index);
            let l1 = DATA_START + (self.level1_physical() + live_l1) * BLOCK;
            ensure_len(&mut self.data, l1 + BLOCK);
            for table in 0..=(self.total_block_count as usize / 170) {
                let info: u32 = if self.level0_secondary { 0x4000_0000 } else { 0 };
                write_at(&mut self.data, l1 + table * 0x18 + 0x14, &info.to_be_bytes());
            }
        }

        let descriptor = 0x379;
        self.data[descriptor + 2] = flags;
        self.data[descriptor + 3..descriptor + 5].copy_from_slice(&table_blocks.to_le_bytes());
        self.data[descriptor + 5..descriptor + 8]
            .copy_from_slice(&first_table_block.to_le_bytes()[..3]);
        self.data[descriptor + 0x1C..descriptor + 0x20]
            .copy_from_slice(&self.total_block_count.to_be_bytes());
        self.data
    }
}

/// Lays out files contiguously after a one-block file table at block 0
pub struct StfsBuilder {
    pub image: StfsImage,
    records: Vec<[u8; 64]>,
    next_free: u32,
}

impl StfsBuilder {
    pub fn new(read_only: bool, total_block_count: u32) -> Self {
        Self::from_image(StfsImage::new(read_only, total_block_count))
    }

    pub fn from_image(image: StfsImage) -> Self {
        Self {
            image,
            records: Vec::new(),
            next_free: 1,
        }
    }

    /// Add a directory and return its record index
    pub fn add_directory(&mut self, name: &str, parent: u16) -> u16 {
        self.records.push(stfs_record(name, true, 0, 0, parent, 0));
        (self.records.len() - 1) as u16
    }

    /// Add a file stored in consecutive blocks and return its record index
    pub fn add_file(&mut self, name: &str, parent: u16, contents: &[u8]) -> u16 {
        let blocks = contents.len().div_ceil(BLOCK) as u32;
        let start = self.next_free;
        let chain: Vec<u32> = (start..start + blocks).collect();
        for (block, chunk) in chain.iter().zip(contents.chunks(BLOCK)) {
            self.image.write_block(*block, chunk);
        }
        self.image.chain(&chain);
        self.next_free += blocks;
        self.records.push(stfs_record(
            name,
            false,
            if blocks == 0 { 0 } else { start },
            blocks,
            parent,
            contents.len() as u32,
        ));
        (self.records.len() - 1) as u16
    }

    /// Add a raw record, for malformed entries
    pub fn add_record(&mut self, record: [u8; 64]) -> u16 {
        self.records.push(record);
        (self.records.len() - 1) as u16
    }

    pub fn finish(mut self) -> Vec<u8> {
        assert!(self.records.len() <= 64);
        let mut table = vec![0u8; BLOCK];
        for (i, record) in self.records.iter().enumerate() {
            table[i * 64..(i + 1) * 64].copy_from_slice(record);
        }
        self.image.write_block(0, &table);
        self.image.chain(&[0]);
        self.image.finish(0, 1)
    }
}

// SVOD

pub const SVOD_BLOCK: usize = 0x800;
pub const MEDIA_MAGIC: &[u8; 20] = b"MICROSOFT*XBOX*MEDIA";

/// XContent header of an SVOD package
pub fn svod_header(enhanced_gdf: bool, start_data_block: u32, data_file_count: u32) -> Vec<u8> {
    let mut data = xcontent_header(b"PIRS", 1, data_file_count);
    let descriptor = 0x379;
    data[descriptor + 0x18] = if enhanced_gdf { 0x40 } else { 0 };
    data[descriptor + 0x1C..descriptor + 0x1F].copy_from_slice(&start_data_block.to_le_bytes()[..3]);
    data
}

/// One GDF directory record, padded to a 4-byte boundary
pub fn svod_record(
    node_l: u16,
    node_r: u16,
    data_block: u32,
    length: u32,
    directory: bool,
    name: &str,
) -> Vec<u8> {
    let mut record = Vec::new();
    record.extend_from_slice(&node_l.to_le_bytes());
    record.extend_from_slice(&node_r.to_le_bytes());
    record.extend_from_slice(&data_block.to_le_bytes());
    record.extend_from_slice(&length.to_le_bytes());
    record.push(if directory { 0x10 } else { 0x80 });
    record.push(name.len() as u8);
    record.extend_from_slice(name.as_bytes());
    record.resize(record.len().next_multiple_of(4), 0xFF);
    record
}

/// Physical offset of a small SVOD block in fragment 0
///
/// Valid for blocks within the first fragment and level-1 group.
pub fn svod_offset(block: u32, enhanced_gdf: bool, single_file: bool) -> usize {
    let true_block = block as usize + if enhanced_gdf { 2 } else { 0 };
    let base = if single_file { 0xB000 } else { 0 };
    true_block * SVOD_BLOCK + (true_block / 0x198 + 1) * 0x1000 + 0x1000 + base
}

/// Fragment image with the magic block and root descriptor in place
pub struct SvodImage {
    pub data: Vec<u8>,
    enhanced_gdf: bool,
    single_file: bool,
}

impl SvodImage {
    pub fn new(base: Vec<u8>, magic_offset: usize, enhanced_gdf: bool, single_file: bool) -> Self {
        let mut data = base;
        write_at(&mut data, magic_offset, MEDIA_MAGIC);
        ensure_len(&mut data, magic_offset + SVOD_BLOCK);
        Self {
            data,
            enhanced_gdf,
            single_file,
        }
    }

    /// Root directory location and creation time, stored after the magic
    pub fn set_root(&mut self, magic_offset: usize, block: u32, size: u32, date: u16, time: u16) {
        let mut fields = Vec::new();
        fields.extend_from_slice(&block.to_le_bytes());
        fields.extend_from_slice(&size.to_le_bytes());
        fields.extend_from_slice(&u32::from(date).to_le_bytes());
        fields.extend_from_slice(&u32::from(time).to_le_bytes());
        write_at(&mut self.data, magic_offset + 0x14, &fields);
    }

    pub fn offset(&self, block: u32) -> usize {
        svod_offset(block, self.enhanced_gdf, self.single_file)
    }

    /// Write a record at `ordinal` of the directory starting at `block`
    pub fn write_record(&mut self, block: u32, ordinal: u16, record: &[u8]) {
        let offset = self.offset(block) + usize::from(ordinal) * 4;
        write_at(&mut self.data, offset, record);
    }

    /// Write `contents` into consecutive blocks starting at `block`
    pub fn write_contents(&mut self, block: u32, contents: &[u8]) {
        for (i, chunk) in contents.chunks(SVOD_BLOCK).enumerate() {
            let offset = self.offset(block + i as u32);
            write_at(&mut self.data, offset, chunk);
        }
    }
}
