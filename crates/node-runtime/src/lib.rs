//! # Node Runtime Library
//!
//! Exposes the runtime's modules for testing. The entry point is the
//! `main.rs` binary.
//!
//! ## Modules
//!
//! - `config` - `NodeConfig` and environment overrides
//! - `runtime` - Boots a collective and drives the replication flow

pub mod config;
pub mod runtime;

pub use config::{load_config, ConfigError, NodeConfig};
pub use runtime::{NodeRuntime, RunSummary};
