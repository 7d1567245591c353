//! Container error types

use std::collections::TryReserveError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use xcontent_formats::FormatError;

/// Closed classification of mount failures
///
/// A successful mount is `Ok`; every [`ContainerError`] maps onto exactly one
/// of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountErrorKind {
    /// I/O or mapping failure, or data that could not be read in bounds
    ReadError,
    /// Not a package, wrong fragment count, or unrecognized layout
    FileMismatch,
    /// Storage sized by on-disk counts could not be allocated
    OutOfMemory,
}

impl fmt::Display for MountErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadError => write!(f, "read error"),
            Self::FileMismatch => write!(f, "file mismatch"),
            Self::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

/// Errors that can occur while mounting or reading a container
#[derive(Debug, Error)]
pub enum ContainerError {
    /// I/O error on a host path
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Host path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A fragment file could not be memory mapped
    #[error("failed to map {path}: {source}")]
    Map {
        /// Host path of the fragment
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Header or record decoding failed
    #[error(transparent)]
    Format(#[from] FormatError),

    /// No file with a package magic was found under a directory
    #[error("no XContent package found under {0}")]
    NoPackageFound(PathBuf),

    /// The `<name>.data` directory of a multi-file package is missing
    #[error("data fragment directory {0} does not exist")]
    MissingDataDirectory(PathBuf),

    /// The `<name>.data` directory holds the wrong number of files
    #[error("expected {expected} data fragments in {dir}, found {found}")]
    FragmentCountMismatch {
        /// Fragment directory
        dir: PathBuf,
        /// Count declared by the header
        expected: u32,
        /// Files present
        found: usize,
    },

    /// A physical address falls outside the mapped fragments
    #[error("read of {len} bytes at 0x{offset:X} is outside fragment {fragment} ({size} bytes)")]
    OutOfBounds {
        /// Fragment index
        fragment: usize,
        /// Byte offset within the fragment
        offset: u64,
        /// Requested length
        len: usize,
        /// Fragment size, 0 if the fragment does not exist
        size: usize,
    },

    /// The EGDF flag is set but the magic block is not at 0x2000
    #[error("SVOD declares an EGDF layout, but no magic block is present at 0x2000")]
    EgdfMagicMissing,

    /// None of the SVOD layouts matched
    #[error("no SVOD magic block found")]
    SvodMagicNotFound,

    /// A block number lies before the SVOD data start
    #[error("SVOD block {block} precedes the data start block {start}")]
    BlockBeforeDataStart {
        /// Requested block
        block: u64,
        /// Declared start block times two
        start: u64,
    },

    /// An STFS record names a parent that has not been emitted yet
    #[error("STFS record {index} references parent {parent}, but only {known} entries precede it")]
    InvalidParent {
        /// Record index in table order
        index: usize,
        /// Referenced parent index
        parent: usize,
        /// Number of entries emitted so far
        known: usize,
    },

    /// A record names a file as its parent
    #[error("{name} cannot be placed under {parent}, which is not a directory")]
    ParentNotDirectory {
        /// Entry name
        name: String,
        /// Name of the referenced parent
        parent: String,
    },

    /// A block chain disagrees with its record (strict mode only)
    #[error("block chain of {name}: {reason}")]
    BrokenChain {
        /// Entry name
        name: String,
        /// Description of the mismatch
        reason: String,
    },

    /// The SVOD directory walk visited more nodes than allowed
    #[error("SVOD directory walk exceeded {0} nodes")]
    TraversalLimit(usize),

    /// Allocation sized by on-disk counts failed
    #[error("allocation failed: {0}")]
    OutOfMemory(#[from] TryReserveError),

    /// The entry id does not exist in this container
    #[error("no entry with id {0}")]
    NoSuchEntry(usize),

    /// Content reads are only valid on files
    #[error("{0} is a directory")]
    IsDirectory(String),
}

impl ContainerError {
    /// Mount taxonomy bucket of this error.
    pub const fn kind(&self) -> MountErrorKind {
        match self {
            Self::Format(e) if e.is_mismatch() => MountErrorKind::FileMismatch,
            Self::NoPackageFound(_)
            | Self::MissingDataDirectory(_)
            | Self::FragmentCountMismatch { .. }
            | Self::EgdfMagicMissing
            | Self::InvalidParent { .. }
            | Self::ParentNotDirectory { .. }
            | Self::BrokenChain { .. }
            | Self::TraversalLimit(_) => MountErrorKind::FileMismatch,
            Self::OutOfMemory(_) => MountErrorKind::OutOfMemory,
            Self::Io { .. }
            | Self::Map { .. }
            | Self::Format(_)
            | Self::OutOfBounds { .. }
            | Self::SvodMagicNotFound
            | Self::BlockBeforeDataStart { .. }
            | Self::NoSuchEntry(_)
            | Self::IsDirectory(_) => MountErrorKind::ReadError,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for container operations
pub type Result<T> = std::result::Result<T, ContainerError>;
