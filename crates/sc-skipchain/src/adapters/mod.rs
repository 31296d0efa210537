//! # Adapters
//!
//! Concrete implementations of the outbound ports.
//!
//! - `crypto`: SHA-256 + BLS12-381 collective crypto, local collective signer
//! - `log`: in-memory and file-backed block logs
//! - `network`: in-process transport

pub mod crypto;
pub mod log;
pub mod network;

pub use crypto::{BlsCollectiveCrypto, CollectiveSigner};
pub use log::{FileLog, MemoryLog};
pub use network::{LocalEndpoint, LocalNetwork};
