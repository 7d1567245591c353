use anyhow::{Context, bail};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use xcontent_vfs::{EntryId, EntryTree, XContentContainer};

use crate::{
    ExtractArgs, MountOptions, OutputFormat,
    output::{OutputStyle, format_bytes, format_header, format_path, format_success},
};

const COPY_CHUNK: usize = 64 * 1024;

#[derive(Serialize, Default)]
struct Summary {
    files: usize,
    directories: usize,
    bytes: u64,
    output: PathBuf,
}

/// Host-safe form of an entry name.
fn sanitize(name: &str) -> String {
    match name {
        "" | "." | ".." => "_".to_string(),
        _ => name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '\0' => '_',
                c => c,
            })
            .collect(),
    }
}

/// Host path of `id` below `output`, relative to `base`.
fn host_path(tree: &EntryTree, output: &Path, base: EntryId, id: EntryId) -> PathBuf {
    let mut names = Vec::new();
    let mut current = Some(id);
    while let Some(node) = current {
        if node == base {
            break;
        }
        let Some(entry) = tree.get(node) else { break };
        names.push(sanitize(entry.name()));
        current = entry.parent();
    }
    names.iter().rev().fold(output.to_path_buf(), |path, name| path.join(name))
}

fn copy_file(container: &XContentContainer, id: EntryId, target: &Path) -> anyhow::Result<u64> {
    let mut file =
        File::create(target).with_context(|| format!("creating {}", target.display()))?;
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut offset = 0u64;
    loop {
        let read = container.read_at(id, offset, &mut buf)?;
        if read == 0 {
            break;
        }
        file.write_all(&buf[..read])
            .with_context(|| format!("writing {}", target.display()))?;
        offset += read as u64;
    }
    Ok(offset)
}

pub fn handle(
    args: ExtractArgs,
    options: &MountOptions,
    format: OutputFormat,
    style: &OutputStyle,
) -> anyhow::Result<()> {
    let container = options.mount(&args.path)?;
    let tree = container.tree();

    let start = match &args.entry {
        Some(path) => match tree.resolve_path(path) {
            Some(id) => id,
            None => bail!("{path} not found in package"),
        },
        None => tree.root(),
    };
    // A single file lands directly in the output directory
    let base = tree
        .get(start)
        .filter(|entry| !entry.is_directory())
        .and_then(|entry| entry.parent())
        .unwrap_or(start);

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let mut summary = Summary {
        output: args.output.clone(),
        ..Summary::default()
    };
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        let Some(entry) = tree.get(id) else { continue };
        let target = host_path(tree, &args.output, base, id);
        if entry.is_directory() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("creating {}", target.display()))?;
            if id != base {
                summary.directories += 1;
            }
            stack.extend(tree.children(id).map(|(child, _)| child));
        } else {
            let written = copy_file(&container, id, &target)?;
            debug!("Extracted {} ({written} bytes)", target.display());
            summary.files += 1;
            summary.bytes += written;
        }
    }

    if let Some(json) = format.to_json(&summary)? {
        println!("{json}");
        return Ok(());
    }

    println!(
        "{} {} files and {} directories ({}) to {}",
        format_header("Extracted", style),
        summary.files,
        summary.directories,
        format_bytes(summary.bytes),
        format_path(&summary.output.display().to_string(), style)
    );
    println!("{}", format_success("Done", style));

    Ok(())
}
