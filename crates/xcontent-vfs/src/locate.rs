//! Header file lookup

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::WalkDir;
use xcontent_formats::PackageMagic;

use crate::{ContainerError, Result};

/// Resolve a caller-supplied path to a package header file.
///
/// A file path is returned as is. A directory is scanned breadth first,
/// each level in filename order, for the first regular file whose first four
/// bytes are a package magic.
pub fn resolve_header_path(path: &Path) -> Result<PathBuf> {
    let metadata = std::fs::metadata(path).map_err(|e| ContainerError::io(path, e))?;
    if !metadata.is_dir() {
        return Ok(path.to_path_buf());
    }

    for depth in 1.. {
        let mut level_found = false;
        for entry in WalkDir::new(path)
            .min_depth(depth)
            .max_depth(depth)
            .sort_by_file_name()
            .into_iter()
            .flatten()
        {
            level_found = true;
            if entry.file_type().is_file() && has_package_magic(entry.path()) {
                debug!("Found package header {}", entry.path().display());
                return Ok(entry.into_path());
            }
        }
        if !level_found {
            break;
        }
    }

    error!("No XContent package found under {}", path.display());
    Err(ContainerError::NoPackageFound(path.to_path_buf()))
}

fn has_package_magic(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut magic))
        .is_ok()
        && PackageMagic::matches(&magic)
}
