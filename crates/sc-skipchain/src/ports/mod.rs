//! # Ports
//!
//! - `inbound`: what transports drive (the replication handler surface)
//! - `outbound`: what the core needs from its host (network, crypto, log)

pub mod inbound;
pub mod outbound;

pub use inbound::MessageHandler;
pub use outbound::{
    AggregateKey, BlockLog, CollectiveCrypto, Network, StreamReceiver, StreamSender,
};
