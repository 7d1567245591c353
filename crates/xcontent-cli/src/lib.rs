//! XContent CLI library
//!
//! Argument types and command handlers behind the `xcontent` binary.

pub mod commands;
pub mod output;

pub use crate::commands::{
    extract::handle as handle_extract, info::handle as handle_info, ls::handle as handle_ls,
};

use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use xcontent_vfs::{MountConfig, XContentContainer};

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Package header file, or a directory containing one
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Package header file, or a directory containing one
    pub path: PathBuf,

    /// Directory inside the package to list
    #[arg(default_value = "")]
    pub entry: String,

    /// Show sizes and timestamps
    #[arg(short, long)]
    pub long: bool,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Package header file, or a directory containing one
    pub path: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// File or directory inside the package to extract (default: everything)
    #[arg(short, long)]
    pub entry: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON output
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

impl OutputFormat {
    /// Serialize `value` in this format; `None` for text output.
    pub fn to_json<T: serde::Serialize>(self, value: &T) -> anyhow::Result<Option<String>> {
        Ok(match self {
            Self::Text => None,
            Self::Json => Some(serde_json::to_string(value)?),
            Self::JsonPretty => Some(serde_json::to_string_pretty(value)?),
        })
    }
}

/// Mount options shared by every command
#[derive(Clone, Debug, Default)]
pub struct MountOptions {
    /// JSON configuration file
    pub config: Option<PathBuf>,
    /// Abort on block chains that disagree with their record
    pub strict: bool,
    /// Override of the SVOD directory node budget
    pub max_directory_nodes: Option<usize>,
}

impl MountOptions {
    /// Build the mount configuration; flags take precedence over the file.
    pub fn mount_config(&self) -> anyhow::Result<MountConfig> {
        let mut config = match &self.config {
            Some(path) => MountConfig::from_json_file(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => MountConfig::default(),
        };
        if self.strict {
            config = config.with_strict_block_chains(true);
        }
        if let Some(nodes) = self.max_directory_nodes {
            config = config.with_max_directory_nodes(nodes);
        }
        Ok(config)
    }

    /// Mount the package at `path`.
    pub fn mount(&self, path: &Path) -> anyhow::Result<XContentContainer> {
        let config = self.mount_config()?;
        XContentContainer::open(path, &config)
            .with_context(|| format!("mounting {}", path.display()))
    }
}
