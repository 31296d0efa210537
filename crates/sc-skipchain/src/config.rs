//! # Skipchain Configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default capacity of each stream direction.
pub const DEFAULT_STREAM_BUFFER: usize = 16;

/// Default upper bound on an encoded block or chain (4 MiB).
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Skipchain node configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipchainConfig {
    /// Messages buffered per stream direction before `send` waits.
    pub stream_buffer: usize,

    /// Largest encoded block or chain accepted by the codec.
    pub max_block_size: usize,

    /// Directory for the block log; `None` keeps blocks in memory.
    pub data_dir: Option<PathBuf>,
}

impl Default for SkipchainConfig {
    fn default() -> Self {
        Self {
            stream_buffer: DEFAULT_STREAM_BUFFER,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            data_dir: None,
        }
    }
}

impl SkipchainConfig {
    /// Create a config for testing (tiny buffers to surface backpressure).
    pub fn for_testing() -> Self {
        Self {
            stream_buffer: 1,
            max_block_size: 64 * 1024,
            data_dir: None,
        }
    }
}
