//! # Inbound Ports (Driving Ports)
//!
//! The protocol surface a transport calls into when a message or a stream
//! arrives for this participant.

use async_trait::async_trait;
use shared_types::{Address, Message};

use super::outbound::{StreamReceiver, StreamSender};
use crate::domain::ReplicationError;
use crate::replication::Cancellation;

/// Handles one-shot calls and duplex streams.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle a one-shot call from `from`, optionally producing a reply.
    async fn process(
        &self,
        from: &Address,
        message: Message,
    ) -> Result<Option<Message>, ReplicationError>;

    /// Serve a stream until done, failed or cancelled.
    ///
    /// Returning `Ok` ends the stream cleanly; an error is reported to the
    /// remote end by the transport.
    async fn stream(
        &self,
        out: Box<dyn StreamSender>,
        input: Box<dyn StreamReceiver>,
        cancellation: Cancellation,
    ) -> Result<(), ReplicationError>;
}
