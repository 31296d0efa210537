//! # Node Configuration
//!
//! Runtime parameters wrapping the skipchain configuration.
//!
//! ## Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SC_NODES` | members per authority |
//! | `SC_BLOCKS` | blocks produced after genesis |
//! | `SC_ROTATE_EVERY` | blocks between authority rotations (0 = never) |
//! | `SC_DATA_DIR` | lagging node keeps its log here |
//! | `SC_STREAM_BUFFER` | messages buffered per stream direction |
//! | `SC_SEED` | derive authority keys from this seed instead of randomly |
//! | `SC_LOG` | tracing filter directive |

use std::path::PathBuf;

use sc_skipchain::SkipchainConfig;
use thiserror::Error;
use tracing::warn;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Members in each authority.
    pub nodes: usize,
    /// Blocks produced after genesis.
    pub blocks: u64,
    /// Blocks between authority rotations; 0 keeps the genesis authority.
    pub rotate_every: u64,
    /// Derive authority keys from this seed; random keys when `None`.
    ///
    /// A seeded collective reproduces the same chain, so a lagging node with
    /// a `data_dir` can resume across runs.
    pub seed: Option<u64>,
    /// Filter directive for the log subscriber.
    pub log_filter: String,
    /// Settings shared by every participant.
    pub skipchain: SkipchainConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            nodes: 4,
            blocks: 12,
            rotate_every: 4,
            seed: None,
            log_filter: "info".to_string(),
            skipchain: SkipchainConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Reject settings the runtime cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes < 2 {
            return Err(ConfigError::TooFewNodes(self.nodes));
        }
        if self.skipchain.stream_buffer == 0 {
            return Err(ConfigError::ZeroStreamBuffer);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An authority needs a leader and at least one other member.
    #[error("SC_NODES must be at least 2, got {0}")]
    TooFewNodes(usize),

    #[error("SC_STREAM_BUFFER must be positive")]
    ZeroStreamBuffer,
}

/// Load configuration from the environment.
pub fn load_config() -> NodeConfig {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration through `lookup`, falling back to defaults.
pub fn load_config_from(lookup: impl Fn(&str) -> Option<String>) -> NodeConfig {
    let mut config = NodeConfig::default();

    if let Some(nodes) = parsed(&lookup, "SC_NODES") {
        config.nodes = nodes;
    }
    if let Some(blocks) = parsed(&lookup, "SC_BLOCKS") {
        config.blocks = blocks;
    }
    if let Some(rotate_every) = parsed(&lookup, "SC_ROTATE_EVERY") {
        config.rotate_every = rotate_every;
    }
    if let Some(seed) = parsed(&lookup, "SC_SEED") {
        config.seed = Some(seed);
    }
    if let Some(buffer) = parsed(&lookup, "SC_STREAM_BUFFER") {
        config.skipchain.stream_buffer = buffer;
    }
    if let Some(dir) = lookup("SC_DATA_DIR") {
        config.skipchain.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(filter) = lookup("SC_LOG") {
        config.log_filter = filter;
    }

    config
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a number", key, raw);
            None
        }
    }
}
