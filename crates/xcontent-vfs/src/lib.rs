//! Read-only mounting of Xbox 360 XContent packages
//!
//! A package is either STFS (installed content, profiles) or SVOD (disc
//! images). Both interleave hash tables with data blocks, so a logical block
//! number has to be translated before it can be read. Mounting maps the
//! backing files, decodes the header, detects the physical layout and builds
//! an immutable [`EntryTree`] whose files carry precomputed block extents.
//!
//! ```no_run
//! use xcontent_vfs::{MountConfig, XContentContainer};
//!
//! let container = XContentContainer::open("TU_12345", &MountConfig::default())?;
//! if let Some(id) = container.tree().resolve_path("default.xex") {
//!     let bytes = container.read_to_vec(id)?;
//!     println!("{} bytes", bytes.len());
//! }
//! # Ok::<(), xcontent_vfs::ContainerError>(())
//! ```

#![allow(clippy::cast_possible_truncation)] // Offsets are validated against mapped lengths
#![allow(clippy::cast_lossless)] // Sometimes clearer than From

pub mod config;
pub mod container;
pub mod device;
pub mod entry;
pub mod error;
pub mod fragment;
pub mod locate;
pub mod stfs;
pub mod svod;

pub use config::MountConfig;
pub use container::{PackageInfo, XContentContainer};
pub use device::VirtualDevice;
pub use entry::{BlockExtent, Entry, EntryId, EntryKind, EntryTree};
pub use error::{ContainerError, MountErrorKind, Result};
pub use fragment::FragmentSet;
pub use locate::resolve_header_path;

// Re-export the on-disk structures callers commonly need
pub use xcontent_formats::{PackageMagic, VolumeType, XContentHeader};
