//! Mount configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ContainerError, Result};

/// Default node budget for the SVOD directory walk.
pub const DEFAULT_MAX_DIRECTORY_NODES: usize = 1 << 20;

/// Options controlling how a package is mounted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Maximum number of SVOD directory records visited before the walk is
    /// considered runaway (cyclic or hostile trees).
    pub max_directory_nodes: usize,

    /// Treat block chains that disagree with their record (allocation count,
    /// premature end of chain) and STFS records parented to a file as fatal
    /// instead of logging a warning.
    pub strict_block_chains: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            max_directory_nodes: DEFAULT_MAX_DIRECTORY_NODES,
            strict_block_chains: false,
        }
    }
}

impl MountConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SVOD directory node budget
    #[must_use]
    pub const fn with_max_directory_nodes(mut self, nodes: usize) -> Self {
        self.max_directory_nodes = nodes;
        self
    }

    /// Enable or disable strict block-chain checks
    #[must_use]
    pub const fn with_strict_block_chains(mut self, strict: bool) -> Self {
        self.strict_block_chains = strict;
        self
    }

    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ContainerError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| ContainerError::io(path, e.into()))
    }
}
