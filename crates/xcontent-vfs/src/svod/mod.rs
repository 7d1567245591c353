//! SVOD volumes
//!
//! - [`SvodLayout`]: detection of the EGDF, XSF and single-file variants
//! - [`block_to_offset`]: logical block to fragment and byte offset
//! - [`SvodDirectoryBuilder`]: GDF directory walk producing the entry tree

pub mod address;
mod directory;
mod layout;

pub use address::{SvodAddress, block_to_offset};
pub use directory::SvodDirectoryBuilder;
pub use layout::{SvodLayout, SvodLayoutKind};
