//! Memory-mapped fragment files
//!
//! A package's logical address space is backed either by the header file
//! itself or, for multi-file packages, by the files of the sibling
//! `<name>.data/` directory in lexical order.

use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::{ContainerError, Result};

/// One mapped fragment file
struct Fragment {
    path: PathBuf,
    mmap: Mmap,
}

/// Ordered, immutable set of mapped fragments
pub struct FragmentSet {
    fragments: Vec<Fragment>,
}

impl FragmentSet {
    /// Map the fragments backing a package whose header file is `header_path`.
    ///
    /// With `data_file_count <= 1` the header file is the only fragment.
    /// Otherwise `<header_path>.data/` must hold exactly `data_file_count`
    /// files, mapped in lexical filename order. Nothing stays mapped when
    /// this fails.
    pub fn map_package(header_path: &Path, data_file_count: u32) -> Result<Self> {
        if data_file_count <= 1 {
            let fragment = map_file(header_path)?;
            return Ok(Self {
                fragments: vec![fragment],
            });
        }

        let mut data_dir = header_path.as_os_str().to_owned();
        data_dir.push(".data");
        let data_dir = PathBuf::from(data_dir);
        if !data_dir.is_dir() {
            error!(
                "Package is multi-file, but {} does not exist",
                data_dir.display()
            );
            return Err(ContainerError::MissingDataDirectory(data_dir));
        }

        let mut paths = Vec::new();
        let entries = std::fs::read_dir(&data_dir).map_err(|e| ContainerError::io(&data_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ContainerError::io(&data_dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| ContainerError::io(entry.path(), e))?;
            if file_type.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if paths.len() != data_file_count as usize {
            error!(
                "Expecting {} data fragments, but {} are present",
                data_file_count,
                paths.len()
            );
            return Err(ContainerError::FragmentCountMismatch {
                dir: data_dir,
                expected: data_file_count,
                found: paths.len(),
            });
        }

        // Already-mapped fragments are unmapped on drop if a later one fails.
        let fragments = paths
            .iter()
            .map(|path| map_file(path.as_path()))
            .collect::<Result<Vec<_>>>()?;

        info!("Mapped {} data fragments", fragments.len());
        Ok(Self { fragments })
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Always false for a mapped set; fragment 0 exists.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Whole contents of fragment `index`.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.fragments.get(index).map(|f| &f.mmap[..])
    }

    /// Host path of fragment `index`.
    pub fn path(&self, index: usize) -> Option<&Path> {
        self.fragments.get(index).map(|f| f.path.as_path())
    }

    /// Combined size of all fragments in bytes.
    pub fn total_size(&self) -> u64 {
        self.fragments.iter().map(|f| f.mmap.len() as u64).sum()
    }

    /// Borrow `len` bytes at `offset` of fragment `index`, validated against
    /// the mapped length.
    pub fn read(&self, index: usize, offset: u64, len: usize) -> Result<&[u8]> {
        let data = self.get(index).unwrap_or(&[]);
        usize::try_from(offset)
            .ok()
            .and_then(|start| Some(start..start.checked_add(len)?))
            .and_then(|range| data.get(range))
            .ok_or(ContainerError::OutOfBounds {
                fragment: index,
                offset,
                len,
                size: data.len(),
            })
    }

    /// Borrow everything from `offset` to the end of fragment `index`.
    pub fn tail(&self, index: usize, offset: u64) -> Result<&[u8]> {
        let data = self.get(index).unwrap_or(&[]);
        usize::try_from(offset)
            .ok()
            .and_then(|start| data.get(start..))
            .ok_or(ContainerError::OutOfBounds {
                fragment: index,
                offset,
                len: 0,
                size: data.len(),
            })
    }
}

/// Memory-map a file read-only.
fn map_file(path: &Path) -> Result<Fragment> {
    let file = File::open(path).map_err(|e| ContainerError::Map {
        path: path.to_path_buf(),
        source: e,
    })?;

    #[allow(unsafe_code)]
    let mmap = unsafe {
        MmapOptions::new().map(&file).map_err(|e| ContainerError::Map {
            path: path.to_path_buf(),
            source: e,
        })?
    };

    debug!("Mapped {} ({} bytes)", path.display(), mmap.len());
    Ok(Fragment {
        path: path.to_path_buf(),
        mmap,
    })
}

impl std::fmt::Debug for FragmentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.fragments.iter().map(|frag| (&frag.path, frag.mmap.len())))
            .finish()
    }
}
