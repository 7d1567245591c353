use anyhow::bail;
use serde::Serialize;
use xcontent_vfs::{EntryId, EntryKind, EntryTree};

use crate::{
    LsArgs, MountOptions, OutputFormat,
    output::{
        OutputStyle, create_table, format_bytes, format_directory, format_ticks, header_cell,
        numeric_cell, regular_cell,
    },
};

#[derive(Serialize)]
struct Listing {
    path: String,
    kind: EntryKind,
    size: u64,
    allocation_size: u64,
    create_timestamp: u64,
    write_timestamp: u64,
    extents: usize,
}

/// Entries below `start` in depth-first order, paired with their depth.
fn walk(tree: &EntryTree, start: EntryId) -> Vec<(EntryId, usize)> {
    let mut out = Vec::new();
    let mut stack: Vec<(EntryId, usize)> = tree.children(start).map(|(id, _)| (id, 0)).collect();
    stack.reverse();
    while let Some((id, depth)) = stack.pop() {
        out.push((id, depth));
        let children: Vec<_> = tree.children(id).map(|(child, _)| child).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }
    out
}

pub fn handle(
    args: LsArgs,
    options: &MountOptions,
    format: OutputFormat,
    style: &OutputStyle,
) -> anyhow::Result<()> {
    let container = options.mount(&args.path)?;
    let tree = container.tree();
    let Some(start) = tree.resolve_path(&args.entry) else {
        bail!("{} not found in package", args.entry);
    };

    let entries = match tree.get(start) {
        Some(entry) if !entry.is_directory() => vec![(start, 0)],
        _ => walk(tree, start),
    };

    if format != OutputFormat::Text {
        let listing: Vec<_> = entries
            .iter()
            .filter_map(|&(id, _)| {
                let entry = tree.get(id)?;
                Some(Listing {
                    path: tree.path_of(id)?,
                    kind: entry.kind(),
                    size: entry.size(),
                    allocation_size: entry.allocation_size(),
                    create_timestamp: entry.create_timestamp(),
                    write_timestamp: entry.write_timestamp(),
                    extents: entry.extents().len(),
                })
            })
            .collect();
        if let Some(json) = format.to_json(&listing)? {
            println!("{json}");
        }
        return Ok(());
    }

    if !args.long {
        for (id, depth) in entries {
            let Some(entry) = tree.get(id) else { continue };
            let name = if entry.is_directory() {
                format_directory(entry.name(), style)
            } else {
                entry.name().to_string()
            };
            println!("{:indent$}{name}", "", indent = depth * 2);
        }
        return Ok(());
    }

    let mut table = create_table(style);
    table.set_header(vec![
        header_cell("Path", style),
        header_cell("Size", style),
        header_cell("Created", style),
        header_cell("Modified", style),
    ]);
    for (id, _) in entries {
        let (Some(entry), Some(path)) = (tree.get(id), tree.path_of(id)) else {
            continue;
        };
        let size = if entry.is_directory() {
            "-".to_string()
        } else {
            format_bytes(entry.size())
        };
        table.add_row(vec![
            regular_cell(&path),
            numeric_cell(&size),
            regular_cell(&format_ticks(entry.create_timestamp())),
            regular_cell(&format_ticks(entry.write_timestamp())),
        ]);
    }
    println!("{table}");

    Ok(())
}
