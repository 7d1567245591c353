//! STFS volumes
//!
//! - [`StfsGeometry`]: logical block to byte offset, hash table placement
//! - [`HashTableCache`]: live-copy selection and decode-once table cache
//! - [`StfsDirectoryBuilder`]: file-table walk producing the entry tree

mod address;
mod directory;
mod hash;

pub use address::StfsGeometry;
pub use directory::StfsDirectoryBuilder;
pub use hash::HashTableCache;
