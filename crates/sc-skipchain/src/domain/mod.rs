//! # Domain Layer
//!
//! Pure data: blocks, rosters, chains and the error taxonomy.

pub mod block;
pub mod chain;
pub mod errors;
pub mod roster;

pub use block::{BlockHeader, SkipBlock};
pub use chain::{Chain, Link};
pub use errors::{ChainError, CodecError, ReplicationError, StoreError};
pub use roster::{Authority, Member, Roster, RosterView};
