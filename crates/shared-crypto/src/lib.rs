//! # Shared Crypto - Collective Authority Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Block identity, payload digests |
//! | `bls` | BLS12-381 (`min_pk`) | Collective signatures, key aggregation |
//!
//! ## Security Properties
//!
//! - **BLS**: signatures and keys are subgroup-checked on parse and on
//!   aggregation; proof-of-possession DST.
//! - **SHA-256**: collision resistant 256-bit digests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bls;
pub mod errors;
pub mod hashing;

// Re-exports
pub use bls::{BlsKeyPair, BlsPublicKey, BlsSignature, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
pub use errors::CryptoError;
pub use hashing::sha256;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
