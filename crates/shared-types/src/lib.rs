//! # Shared Types Crate
//!
//! Value types and wire messages shared by the skipchain core, the crypto
//! crate and the node runtime.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a crate boundary
//!   lives here.
//! - **Transport Agnostic**: messages are plain data; framing and addressing
//!   belong to the transport.

pub mod entities;
pub mod errors;
pub mod ipc;

pub use entities::*;
pub use errors::*;
pub use ipc::*;
