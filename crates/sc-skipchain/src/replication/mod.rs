//! # Replication
//!
//! Both sides of the protocol.
//!
//! | Piece | Side | Surface |
//! |-------|------|---------|
//! | `ReplicationHandler` | serving | `PropagateGenesis` call, `BlockRequest` stream |
//! | `CatchUp` | requesting | opens the stream, verifies and stores blocks |
//! | `GenesisPropagator` | proposing | calls every roster member |

mod cancel;
mod catch_up;
mod handler;
mod propagate;

pub use cancel::{cancellation, Cancellation, CancellationHandle};
pub use catch_up::{CatchUp, CatchUpReport};
pub use handler::ReplicationHandler;
pub use propagate::GenesisPropagator;

#[cfg(test)]
mod tests;
