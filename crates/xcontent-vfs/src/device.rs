//! Virtual device interface
//!
//! The surrounding file system registers mounted packages behind this trait
//! and never needs to know which volume format backs them.

use crate::{EntryId, EntryTree, Result};

/// A mounted, read-only device exposing an entry tree
pub trait VirtualDevice: Send + Sync {
    /// Device name reported to the guest ("STFS" or "SVOD")
    fn name(&self) -> &str;

    /// Entry tree of the device
    fn tree(&self) -> &EntryTree;

    /// Resolve a `/` or `\` separated path from the device root
    fn resolve_path(&self, path: &str) -> Option<EntryId> {
        self.tree().resolve_path(path)
    }

    /// Copy file content starting at `offset` into `buf`, returning the
    /// number of bytes copied. Fewer bytes than requested are returned at
    /// the end of the file.
    fn read_at(&self, id: EntryId, offset: u64, buf: &mut [u8]) -> Result<usize>;
}
