//! # Skipchain Core
//!
//! An append-only, hash-linked block ledger replicated across a collective.
//! Each block is co-signed by the authority recorded in the block before it,
//! and authorities may rotate from block to block.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | `store` | Ordered, indexed, append-only block storage |
//! | `codec` | Wire form of blocks and chains, tamper detection |
//! | `consensus` | Build and verify authority-transition chains |
//! | `replication` | Genesis propagation and catch-up streaming |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Blocks, rosters, chains, errors
//! - `ports/` - Inbound (`MessageHandler`) and outbound (`Network`,
//!   `CollectiveCrypto`, `BlockLog`) traits
//! - `adapters/` - BLS crypto, memory and file logs, in-process network
//! - `service.rs` - Wires one participant's chain
//!
//! ## Usage
//!
//! ```ignore
//! use sc_skipchain::{BlsCollectiveCrypto, LocalNetwork, SkipchainConfig, SkipchainService};
//!
//! let crypto = Arc::new(BlsCollectiveCrypto::new());
//! let leader = SkipchainService::in_memory(SkipchainConfig::default(), crypto.clone())?;
//! let genesis = leader.create_genesis(signer.roster(), b"hello".to_vec())?;
//!
//! let network = LocalNetwork::new(16);
//! network.register("leader".into(), leader.handler());
//!
//! let follower = SkipchainService::in_memory(SkipchainConfig::default(), crypto)?;
//! follower
//!     .catch_up()
//!     .catch_up(&network.endpoint("follower".into()), &"leader".into(), genesis.hash)
//!     .await?;
//! ```

pub mod adapters;
pub mod codec;
pub mod config;
pub mod consensus;
pub mod domain;
pub mod ports;
pub mod replication;
pub mod service;
pub mod store;

/// Test authorities, signed chain builders and a recording crypto.
///
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{
    BlsCollectiveCrypto, CollectiveSigner, FileLog, LocalEndpoint, LocalNetwork, MemoryLog,
};
pub use codec::BlockCodec;
pub use config::SkipchainConfig;
pub use consensus::ChainEngine;
pub use domain::{
    Authority, BlockHeader, Chain, ChainError, CodecError, Link, Member, ReplicationError, Roster,
    RosterView, SkipBlock, StoreError,
};
pub use ports::{
    AggregateKey, BlockLog, CollectiveCrypto, MessageHandler, Network, StreamReceiver,
    StreamSender,
};
pub use replication::{
    cancellation, Cancellation, CancellationHandle, CatchUp, CatchUpReport, GenesisPropagator,
    ReplicationHandler,
};
pub use service::SkipchainService;
pub use store::BlockStore;
