//! SVOD mounting against synthetic images

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_truncation)]

mod common;

use common::{
    MODIFIED_DATE, MODIFIED_TIME, SVOD_BLOCK, SvodImage, pattern, svod_header, svod_record,
    write_at, write_file,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::{TempDir, tempdir};
use xcontent_vfs::svod::SvodLayoutKind;
use xcontent_vfs::{
    BlockExtent, ContainerError, EntryKind, MountConfig, MountErrorKind, XContentContainer,
};

/// Ticks of 2025-01-01 12:30:10
const MODIFIED_TICKS: u64 = 133_802_082_100_000_000;

/// Header plus `<name>.data/Data0000` and `Data0001` of an EGDF image:
///
/// ```text
/// default.xex   blocks 10..11
/// Media/
///   intro.wmv   block 12
///   tail.bin    block 0x14386, first block of fragment 1
/// zeta.bin      blocks 0x195..0x197, across a level-0 hash block
/// Empty/
/// ```
fn egdf_package() -> (TempDir, PathBuf) {
    let mut image = SvodImage::new(Vec::new(), 0x2000, true, false);
    image.set_root(0x2000, 2, SVOD_BLOCK as u32, MODIFIED_DATE, MODIFIED_TIME);

    image.write_record(2, 0, &svod_record(5, 12, 3, SVOD_BLOCK as u32, true, "Media"));
    image.write_record(2, 5, &svod_record(0, 0, 10, 3000, false, "default.xex"));
    image.write_record(2, 12, &svod_record(0, 18, 0x195, 3 * SVOD_BLOCK as u32, false, "zeta.bin"));
    image.write_record(2, 18, &svod_record(0, 0, 0, 0, true, "Empty"));

    image.write_record(3, 0, &svod_record(0, 6, 12, 100, false, "intro.wmv"));
    image.write_record(3, 6, &svod_record(0, 0, 0x14386, SVOD_BLOCK as u32, false, "tail.bin"));

    image.write_contents(10, &pattern(1, 3000));
    image.write_contents(12, &pattern(2, 100));
    image.write_contents(0x195, &pattern(3, 3 * SVOD_BLOCK));

    let mut second = vec![0u8; 0x2000];
    second.extend_from_slice(&pattern(4, SVOD_BLOCK));

    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "PKG", &svod_header(true, 0, 2));
    let data_dir = dir.path().join("PKG.data");
    std::fs::create_dir(&data_dir).unwrap();
    write_file(&data_dir, "Data0001", &second);
    write_file(&data_dir, "Data0000", &image.data);
    (dir, path)
}

#[test]
fn test_egdf_tree_order() {
    let (_dir, path) = egdf_package();
    let container = XContentContainer::open(&path, &MountConfig::default()).unwrap();
    assert_eq!(container.device_name(), "SVOD");
    assert_eq!(
        container.svod_layout().unwrap().kind,
        SvodLayoutKind::EnhancedGdf
    );
    assert_eq!(container.fragments().len(), 2);

    let mut dump = String::new();
    container.tree().dump(&mut dump).unwrap();
    assert_eq!(
        dump,
        "default.xex\nMedia/\n  intro.wmv\n  tail.bin\nzeta.bin\nEmpty/\n"
    );

    let empty = container.tree().resolve_path("Empty").unwrap();
    assert_eq!(container.tree().children(empty).count(), 0);
}

#[test]
fn test_egdf_contents() {
    let (_dir, path) = egdf_package();
    let container = XContentContainer::open(&path, &MountConfig::default()).unwrap();
    let tree = container.tree();

    for (path, contents) in [
        ("default.xex", pattern(1, 3000)),
        ("Media/intro.wmv", pattern(2, 100)),
        ("Media/tail.bin", pattern(4, SVOD_BLOCK)),
        ("zeta.bin", pattern(3, 3 * SVOD_BLOCK)),
    ] {
        let id = tree.resolve_path(path).unwrap();
        assert_eq!(container.read_to_vec(id).unwrap(), contents, "{path}");
    }

    let default = tree.get(tree.resolve_path("default.xex").unwrap()).unwrap();
    assert_eq!(default.allocation_size(), 0x1000);
    assert_eq!(
        default.extents(),
        &[BlockExtent {
            fragment: 0,
            offset: 0x8000,
            length: 3000,
        }]
    );

    let zeta = tree.get(tree.resolve_path("zeta.bin").unwrap()).unwrap();
    assert_eq!(
        zeta.extents(),
        &[
            BlockExtent {
                fragment: 0,
                offset: 0xCD800,
                length: 0x800,
            },
            BlockExtent {
                fragment: 0,
                offset: 0xCF000,
                length: 0x1000,
            },
        ]
    );

    let tail = tree.get(tree.resolve_path("media/TAIL.BIN").unwrap()).unwrap();
    assert_eq!(tail.extents()[0].fragment, 1);
    assert_eq!(tail.extents()[0].offset, 0x2000);
}

#[test]
fn test_timestamps_inherited_from_root() {
    let (_dir, path) = egdf_package();
    let container = XContentContainer::open(&path, &MountConfig::default()).unwrap();

    for (_, entry) in container.tree().iter() {
        assert_eq!(entry.create_timestamp(), MODIFIED_TICKS);
        assert_eq!(entry.access_timestamp(), MODIFIED_TICKS);
        assert_eq!(entry.write_timestamp(), MODIFIED_TICKS);
    }
}

#[test]
fn test_single_file_layout() {
    let mut image = SvodImage::new(svod_header(false, 0, 1), 0xD000, false, true);
    image.set_root(0xD000, 2, SVOD_BLOCK as u32, MODIFIED_DATE, MODIFIED_TIME);
    image.write_record(2, 0, &svod_record(8, 0, 4, 5000, false, "b.bin"));
    image.write_record(2, 8, &svod_record(0, 0, 8, 10, false, "a.bin"));
    image.write_contents(4, &pattern(5, 5000));
    image.write_contents(8, &pattern(6, 10));

    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "single", &image.data);
    let container = XContentContainer::open(&path, &MountConfig::default()).unwrap();

    let layout = container.svod_layout().unwrap();
    assert_eq!(layout.kind, SvodLayoutKind::SingleFile);
    assert_eq!(layout.base_offset, 0xB000);

    let names: Vec<_> = container
        .tree()
        .children(container.tree().root())
        .map(|(_, entry)| entry.name().to_string())
        .collect();
    assert_eq!(names, ["a.bin", "b.bin"]);

    let b = container.tree().resolve_path("b.bin").unwrap();
    assert_eq!(
        container.tree().get(b).unwrap().extents(),
        &[BlockExtent {
            fragment: 0,
            offset: 0xF000,
            length: 5000,
        }]
    );
    assert_eq!(container.read_to_vec(b).unwrap(), pattern(5, 5000));
    assert_eq!(container.info().file_count, 2);
}

#[test]
fn test_cyclic_directory_hits_traversal_limit() {
    let mut image = SvodImage::new(svod_header(false, 0, 1), 0xD000, false, true);
    image.set_root(0xD000, 2, SVOD_BLOCK as u32, MODIFIED_DATE, MODIFIED_TIME);
    image.write_record(2, 0, &svod_record(0, 8, 4, 1, false, "a"));
    // Right child points back at itself
    image.write_record(2, 8, &svod_record(0, 8, 4, 1, false, "b"));

    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "cycle", &image.data);
    let config = MountConfig::new().with_max_directory_nodes(64);
    let err = XContentContainer::open(&path, &config).unwrap_err();
    assert!(matches!(err, ContainerError::TraversalLimit(64)));
    assert_eq!(err.kind(), MountErrorKind::FileMismatch);
}

#[test]
fn test_egdf_without_magic_fails() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "broken", &svod_header(true, 0, 1));

    let err = XContentContainer::open(&path, &MountConfig::default()).unwrap_err();
    assert!(matches!(err, ContainerError::EgdfMagicMissing));
}

#[test]
fn test_directory_entries_have_no_extents() {
    let (_dir, path) = egdf_package();
    let container = XContentContainer::open(&path, &MountConfig::default()).unwrap();

    for (_, entry) in container.tree().iter() {
        if entry.kind() == EntryKind::Directory {
            assert!(entry.extents().is_empty());
            assert_eq!(entry.size(), 0);
        }
    }
}

/// Write `fragment0` as `Data0000` next to a header declaring two data files
fn two_fragment_package(header: &[u8], fragment0: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "PKG", header);
    let data_dir = dir.path().join("PKG.data");
    std::fs::create_dir(&data_dir).unwrap();
    write_file(&data_dir, "Data0000", fragment0);
    write_file(&data_dir, "Data0001", &[0u8; 0x2000]);
    (dir, path)
}

#[test]
fn test_directory_records_spill_into_next_block() {
    let mut image = SvodImage::new(Vec::new(), 0x2000, true, false);
    image.set_root(0x2000, 0x195, 0x1000, MODIFIED_DATE, MODIFIED_TIME);
    image.write_record(0x195, 0, &svod_record(0, 0x200, 0x10, 100, false, "a.bin"));

    // Ordinal 0x200 starts block 0x196, which lies past a level-0 hash table
    // rather than directly after block 0x195
    assert_eq!(image.offset(0x195), 0xCD800);
    assert_eq!(image.offset(0x196), 0xCF000);
    write_at(&mut image.data, 0xCF000, &svod_record(0, 0, 0x11, 200, false, "spill.bin"));
    image.write_contents(0x10, &pattern(5, 100));
    image.write_contents(0x11, &pattern(6, 200));

    let (_dir, path) = two_fragment_package(&svod_header(true, 0, 2), &image.data);
    let container = XContentContainer::open(&path, &MountConfig::default()).unwrap();
    let tree = container.tree();

    let mut dump = String::new();
    tree.dump(&mut dump).unwrap();
    assert_eq!(dump, "a.bin\nspill.bin\n");

    let spill = tree.resolve_path("spill.bin").unwrap();
    assert_eq!(tree.get(spill).unwrap().size(), 200);
    assert_eq!(container.read_to_vec(spill).unwrap(), pattern(6, 200));
}

fn xsf_package(labeled: bool) -> (TempDir, PathBuf) {
    let mut image = SvodImage::new(Vec::new(), 0x12000, false, false);
    if labeled {
        write_at(&mut image.data, 0x2000, b"XSF");
    }
    image.set_root(0x12000, 0x30, SVOD_BLOCK as u32, MODIFIED_DATE, MODIFIED_TIME);
    image.write_record(0x30, 0, &svod_record(0, 4, 0x40, 3000, false, "default.xex"));
    image.write_record(0x30, 4, &svod_record(0, 0, 0x31, SVOD_BLOCK as u32, true, "Media"));
    image.write_record(0x31, 0, &svod_record(0, 0, 0x42, 10, false, "intro.wmv"));
    image.write_contents(0x40, &pattern(7, 3000));
    image.write_contents(0x42, &pattern(8, 10));

    two_fragment_package(&svod_header(false, 0, 2), &image.data)
}

#[test]
fn test_xsf_layouts_mount() {
    for (labeled, kind) in [
        (true, SvodLayoutKind::Xsf),
        (false, SvodLayoutKind::XsfUnlabeled),
    ] {
        let (_dir, path) = xsf_package(labeled);
        let container = XContentContainer::open(&path, &MountConfig::default()).unwrap();

        let layout = container.svod_layout().unwrap();
        assert_eq!(layout.kind, kind);
        assert_eq!(layout.base_offset, 0x10000);
        assert_eq!(layout.magic_offset, 0x12000);

        let tree = container.tree();
        let mut dump = String::new();
        tree.dump(&mut dump).unwrap();
        assert_eq!(dump, "default.xex\nMedia/\n  intro.wmv\n");

        // No base offset in front of XSF data blocks
        let xex = tree.resolve_path("default.xex").unwrap();
        assert_eq!(
            tree.get(xex).unwrap().extents(),
            &[BlockExtent {
                fragment: 0,
                offset: 0x40 * 0x800 + 0x2000,
                length: 3000,
            }]
        );
        assert_eq!(container.read_to_vec(xex).unwrap(), pattern(7, 3000));
        let intro = tree.resolve_path("Media/intro.wmv").unwrap();
        assert_eq!(container.read_to_vec(intro).unwrap(), pattern(8, 10));
        assert_eq!(
            container.info().svod_layout.as_deref(),
            Some(kind.to_string().as_str())
        );
    }
}
