//! Mounted XContent container

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use xcontent_formats::{PackageMagic, VolumeDescriptor, VolumeType, XContentHeader};

use crate::device::VirtualDevice;
use crate::entry::{EntryId, EntryKind, EntryTree};
use crate::stfs::{HashTableCache, StfsDirectoryBuilder, StfsGeometry};
use crate::svod::{SvodDirectoryBuilder, SvodLayout};
use crate::{ContainerError, FragmentSet, MountConfig, Result, resolve_header_path};

/// Format-specific state kept after mounting
#[derive(Debug)]
enum Volume {
    Stfs { hash_tables: HashTableCache },
    Svod { layout: SvodLayout },
}

/// A fully parsed, read-only STFS or SVOD package
///
/// All parsing happens in [`XContentContainer::open`]; afterwards the tree
/// and the mapped fragments are immutable and can be shared across threads.
#[derive(Debug)]
pub struct XContentContainer {
    header_path: PathBuf,
    header: XContentHeader,
    fragments: FragmentSet,
    tree: EntryTree,
    volume: Volume,
}

/// Summary of a mounted package
#[derive(Debug, Clone, Serialize)]
pub struct PackageInfo {
    /// Host path of the header file
    pub path: PathBuf,
    /// Package type
    pub magic: PackageMagic,
    /// Volume format
    pub volume_type: VolumeType,
    /// SVOD layout variant, if any
    pub svod_layout: Option<String>,
    /// Whether the volume is read-only on disk
    pub read_only: bool,
    /// Content type
    pub content_type: u32,
    /// Title id
    pub title_id: u32,
    /// Media id
    pub media_id: u32,
    /// Title version
    pub version: u32,
    /// Display name
    pub display_name: String,
    /// Description
    pub description: String,
    /// Title name
    pub title_name: String,
    /// Publisher
    pub publisher: String,
    /// Data files declared by the header
    pub data_file_count: u32,
    /// Mapped fragment files
    pub fragment_count: usize,
    /// Combined size of the mapped fragments
    pub mapped_size: u64,
    /// Number of files
    pub file_count: usize,
    /// Number of directories, excluding the root
    pub directory_count: usize,
    /// Combined size of all files
    pub content_size: u64,
}

impl XContentContainer {
    /// Mount the package at `path`, a header file or a directory holding one.
    ///
    /// Either the whole package is parsed or an error is returned and nothing
    /// stays mapped.
    pub fn open(path: impl AsRef<Path>, config: &MountConfig) -> Result<Self> {
        let path = path.as_ref();
        Self::mount(path, config).inspect_err(|e| {
            error!("Failed to mount {}: {e} ({})", path.display(), e.kind());
        })
    }

    fn mount(path: &Path, config: &MountConfig) -> Result<Self> {
        let header_path = resolve_header_path(path)?;
        let header_file = FragmentSet::map_package(&header_path, 0)?;
        let header = XContentHeader::parse(header_file.get(0).unwrap_or_default())?;

        // STFS always reads the header file; only SVOD spreads over `.data/`
        let (fragments, tree, volume) = match &header.volume_descriptor {
            VolumeDescriptor::Stfs(descriptor) => {
                if !descriptor.is_valid() {
                    warn!(
                        "STFS descriptor length is 0x{:02X}, expected 0x{:02X}",
                        descriptor.descriptor_length,
                        xcontent_formats::StfsVolumeDescriptor::SIZE
                    );
                }
                if header.data_file_count > 1 {
                    warn!("STFS container is not a single file, loading might fail");
                }

                let geometry = StfsGeometry::new(header.header_size, descriptor);
                let mut hash_tables = HashTableCache::new(geometry, descriptor);
                let tree = StfsDirectoryBuilder::new(&header_file, &mut hash_tables, config)
                    .build(descriptor)?;
                (header_file, tree, Volume::Stfs { hash_tables })
            }
            VolumeDescriptor::Svod(descriptor) => {
                let fragments = if header.data_file_count <= 1 {
                    header_file
                } else {
                    drop(header_file);
                    FragmentSet::map_package(&header_path, header.data_file_count)?
                };
                let layout = SvodLayout::detect(&fragments, descriptor, header.data_file_count)?;
                let tree = SvodDirectoryBuilder::new(&fragments, &layout, config).build()?;
                (fragments, tree, Volume::Svod { layout })
            }
        };

        info!(
            "Mounted {} {} package {} ({} entries, {} fragments)",
            header.magic,
            header.volume_type,
            header_path.display(),
            tree.len() - 1,
            fragments.len()
        );

        Ok(Self {
            header_path,
            header,
            fragments,
            tree,
            volume,
        })
    }

    /// Decoded package header.
    pub const fn header(&self) -> &XContentHeader {
        &self.header
    }

    /// Host path of the header file.
    pub fn header_path(&self) -> &Path {
        &self.header_path
    }

    /// Entry tree.
    pub const fn tree(&self) -> &EntryTree {
        &self.tree
    }

    /// Mapped fragments.
    pub const fn fragments(&self) -> &FragmentSet {
        &self.fragments
    }

    /// Detected SVOD layout, `None` for STFS packages.
    pub const fn svod_layout(&self) -> Option<&SvodLayout> {
        match &self.volume {
            Volume::Svod { layout } => Some(layout),
            Volume::Stfs { .. } => None,
        }
    }

    /// Number of STFS hash tables decoded while mounting, 0 for SVOD.
    pub fn cached_hash_tables(&self) -> usize {
        match &self.volume {
            Volume::Stfs { hash_tables } => hash_tables.len(),
            Volume::Svod { .. } => 0,
        }
    }

    /// Device name of the volume format.
    pub const fn device_name(&self) -> &'static str {
        match self.volume {
            Volume::Stfs { .. } => "STFS",
            Volume::Svod { .. } => "SVOD",
        }
    }

    /// Copy file content of `id` starting at `offset` into `buf`.
    ///
    /// Returns the number of bytes copied, which is short at the end of the
    /// file or where a damaged block chain ended early.
    pub fn read_at(&self, id: EntryId, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let entry = self
            .tree
            .get(id)
            .ok_or(ContainerError::NoSuchEntry(id.index()))?;
        if entry.is_directory() {
            return Err(ContainerError::IsDirectory(
                self.tree.path_of(id).unwrap_or_default(),
            ));
        }
        if offset >= entry.size() {
            return Ok(0);
        }

        let wanted = (entry.size() - offset).min(buf.len() as u64);
        let mut copied = 0u64;
        let mut extent_start = 0u64;
        for extent in entry.extents() {
            if copied == wanted {
                break;
            }
            let extent_end = extent_start + extent.length;
            let position = offset + copied;
            if position < extent_end {
                let within = position - extent_start;
                let count = (extent.length - within).min(wanted - copied);
                let source =
                    self.fragments
                        .read(extent.fragment, extent.offset + within, count as usize)?;
                let target = copied as usize;
                buf[target..target + source.len()].copy_from_slice(source);
                copied += count;
            }
            extent_start = extent_end;
        }

        Ok(copied as usize)
    }

    /// Read the whole content of file `id`.
    pub fn read_to_vec(&self, id: EntryId) -> Result<Vec<u8>> {
        let size = self
            .tree
            .get(id)
            .ok_or(ContainerError::NoSuchEntry(id.index()))?
            .size() as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(size)?;
        data.resize(size, 0);
        let read = self.read_at(id, 0, &mut data)?;
        data.truncate(read);
        Ok(data)
    }

    /// Summarize the package.
    pub fn info(&self) -> PackageInfo {
        let header = &self.header;
        let (mut file_count, mut directory_count, mut content_size) = (0, 0, 0);
        for (id, entry) in self.tree.iter() {
            match entry.kind() {
                EntryKind::File => {
                    file_count += 1;
                    content_size += entry.size();
                }
                EntryKind::Directory if id != EntryId::ROOT => directory_count += 1,
                EntryKind::Directory => {}
            }
        }

        PackageInfo {
            path: self.header_path.clone(),
            magic: header.magic,
            volume_type: header.volume_type,
            svod_layout: self.svod_layout().map(|layout| layout.kind.to_string()),
            read_only: header.is_read_only(),
            content_type: header.content_type,
            title_id: header.title_id(),
            media_id: header.execution_info.media_id,
            version: header.execution_info.version,
            display_name: header.display_name(),
            description: header.description(),
            title_name: header.title_name(),
            publisher: header.publisher(),
            data_file_count: header.data_file_count,
            fragment_count: self.fragments.len(),
            mapped_size: self.fragments.total_size(),
            file_count,
            directory_count,
            content_size,
        }
    }
}

impl VirtualDevice for XContentContainer {
    fn name(&self) -> &str {
        self.device_name()
    }

    fn tree(&self) -> &EntryTree {
        &self.tree
    }

    fn read_at(&self, id: EntryId, offset: u64, buf: &mut [u8]) -> Result<usize> {
        Self::read_at(self, id, offset, buf)
    }
}
