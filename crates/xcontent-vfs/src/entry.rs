//! Entry arena
//!
//! Entries are stored in a flat vector and addressed by [`EntryId`]. Each
//! entry records its parent id and the ids of its children in on-disk order.
//! The root is always id 0, has no name and owns the whole tree.

use serde::Serialize;
use std::fmt;

use crate::Result;

/// Stable index of an entry within its [`EntryTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntryId(usize);

impl EntryId {
    /// Id of the synthetic root directory
    pub const ROOT: Self = Self(0);

    /// Position in the arena.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether an entry is a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    /// Regular file with content extents
    File,
    /// Directory with children, no content
    Directory,
}

/// One contiguous physical range backing part of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockExtent {
    /// Index of the fragment holding the range
    pub fragment: usize,
    /// Byte offset within the fragment
    pub offset: u64,
    /// Length in bytes
    pub length: u64,
}

/// A file or directory of a mounted package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    kind: EntryKind,
    size: u64,
    allocation_size: u64,
    create_timestamp: u64,
    access_timestamp: u64,
    write_timestamp: u64,
    extents: Vec<BlockExtent>,
    parent: Option<EntryId>,
    children: Vec<EntryId>,
}

impl Entry {
    pub(crate) fn directory(name: String) -> Self {
        Self {
            name,
            kind: EntryKind::Directory,
            size: 0,
            allocation_size: 0,
            create_timestamp: 0,
            access_timestamp: 0,
            write_timestamp: 0,
            extents: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn file(name: String, extents: Vec<BlockExtent>) -> Self {
        Self {
            kind: EntryKind::File,
            extents,
            ..Self::directory(name)
        }
    }

    #[must_use]
    pub(crate) const fn with_size(mut self, size: u64, allocation_size: u64) -> Self {
        self.size = size;
        self.allocation_size = allocation_size;
        self
    }

    #[must_use]
    pub(crate) const fn with_timestamps(mut self, create: u64, access: u64, write: u64) -> Self {
        self.create_timestamp = create;
        self.access_timestamp = access;
        self.write_timestamp = write;
        self
    }

    /// Entry name, empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File or directory.
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Whether this entry is a directory.
    pub const fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    /// Content size in bytes.
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Size rounded up to the allocation unit.
    pub const fn allocation_size(&self) -> u64 {
        self.allocation_size
    }

    /// Creation time in 100 ns ticks since 1601-01-01.
    pub const fn create_timestamp(&self) -> u64 {
        self.create_timestamp
    }

    /// Last access time in 100 ns ticks since 1601-01-01.
    pub const fn access_timestamp(&self) -> u64 {
        self.access_timestamp
    }

    /// Last write time in 100 ns ticks since 1601-01-01.
    pub const fn write_timestamp(&self) -> u64 {
        self.write_timestamp
    }

    /// Physical ranges holding the content, in logical order.
    pub fn extents(&self) -> &[BlockExtent] {
        &self.extents
    }

    /// Parent directory, `None` for the root.
    pub const fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    /// Children in on-disk order.
    pub fn children(&self) -> &[EntryId] {
        &self.children
    }
}

/// Immutable tree of a mounted package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTree {
    entries: Vec<Entry>,
}

impl EntryTree {
    /// Create a tree holding only the root directory.
    pub(crate) fn new(root_timestamp: u64) -> Self {
        let root = Entry::directory(String::new()).with_timestamps(
            root_timestamp,
            root_timestamp,
            root_timestamp,
        );
        Self {
            entries: vec![root],
        }
    }

    /// Append `entry` as the last child of `parent`, which must be a
    /// directory.
    pub(crate) fn push(&mut self, parent: EntryId, mut entry: Entry) -> Result<EntryId> {
        let id = EntryId(self.entries.len());
        self.entries.try_reserve(1)?;
        let parent_entry = self
            .entries
            .get_mut(parent.0)
            .ok_or(crate::ContainerError::NoSuchEntry(parent.0))?;
        if !parent_entry.is_directory() {
            return Err(crate::ContainerError::ParentNotDirectory {
                name: entry.name,
                parent: parent_entry.name.clone(),
            });
        }
        parent_entry.children.try_reserve(1)?;
        parent_entry.children.push(id);
        entry.parent = Some(parent);
        self.entries.push(entry);
        Ok(id)
    }

    /// Id of the root directory.
    pub const fn root(&self) -> EntryId {
        EntryId::ROOT
    }

    /// Look up an entry.
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id.0)
    }

    /// Children of `id`, empty for files and unknown ids.
    pub fn children(&self, id: EntryId) -> impl Iterator<Item = (EntryId, &Entry)> {
        self.get(id)
            .map(Entry::children)
            .unwrap_or_default()
            .iter()
            .filter_map(move |&child| Some((child, self.get(child)?)))
    }

    /// Number of entries including the root.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true; the root always exists.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in creation order, root first.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &Entry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (EntryId(index), entry))
    }

    /// Resolve a `/` or `\` separated path from the root, ignoring ASCII case.
    ///
    /// Empty components are skipped, so `""` and `"/"` resolve to the root.
    pub fn resolve_path(&self, path: &str) -> Option<EntryId> {
        path.split(['/', '\\'])
            .filter(|component| !component.is_empty())
            .try_fold(EntryId::ROOT, |current, component| {
                self.children(current)
                    .find(|(_, entry)| entry.name.eq_ignore_ascii_case(component))
                    .map(|(id, _)| id)
            })
    }

    /// Full `/` separated path of `id`, without a leading separator.
    pub fn path_of(&self, id: EntryId) -> Option<String> {
        let mut components = Vec::new();
        let mut current = self.get(id)?;
        while let Some(parent) = current.parent {
            components.push(current.name.as_str());
            current = self.get(parent)?;
        }
        components.reverse();
        Some(components.join("/"))
    }

    /// Write the tree one entry per line, children indented two spaces per
    /// level.
    pub fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        let mut stack = vec![(EntryId::ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(entry) = self.get(id) else {
                continue;
            };
            if id != EntryId::ROOT {
                let suffix = if entry.is_directory() { "/" } else { "" };
                writeln!(out, "{:indent$}{}{suffix}", "", entry.name, indent = (depth - 1) * 2)?;
            }
            stack.extend(entry.children.iter().rev().map(|&child| (child, depth + 1)));
        }
        Ok(())
    }
}

impl fmt::Display for EntryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}
