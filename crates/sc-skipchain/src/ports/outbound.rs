//! # Outbound Ports (Driven Ports)
//!
//! Capabilities the skipchain core consumes from its host.
//!
//! Production: `BlsCollectiveCrypto`, `FileLog`, a real transport.
//! Testing: `LocalNetwork`, `MemoryLog`, `RecordingCrypto`.

use async_trait::async_trait;
use shared_crypto::CryptoError;
use shared_types::{Address, Digest, Message, TransportError};

use crate::domain::{Authority, SkipBlock, StoreError};

/// Aggregate public key of an authority, in the crypto backend's encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateKey(pub Vec<u8>);

/// Hashing and collective signature verification.
pub trait CollectiveCrypto: Send + Sync {
    /// The collective hash.
    fn hash(&self, data: &[u8]) -> Digest;

    /// Combine the public keys of every member of `authority`.
    fn aggregate_public_key(&self, authority: &dyn Authority) -> Result<AggregateKey, CryptoError>;

    /// Check `signature` over `message` against an aggregate key.
    fn verify(&self, key: &AggregateKey, message: &[u8], signature: &[u8])
        -> Result<(), CryptoError>;
}

/// Ordered append log backing the block store.
///
/// `append` must be durable when it returns `Ok`.
pub trait BlockLog: Send {
    /// Every block previously appended, in order.
    fn load(&mut self) -> Result<Vec<SkipBlock>, StoreError>;

    /// Durably append one block.
    fn append(&mut self, block: &SkipBlock) -> Result<(), StoreError>;
}

impl<L: BlockLog + ?Sized> BlockLog for Box<L> {
    fn load(&mut self) -> Result<Vec<SkipBlock>, StoreError> {
        (**self).load()
    }

    fn append(&mut self, block: &SkipBlock) -> Result<(), StoreError> {
        (**self).append(block)
    }
}

/// Sending half of a duplex stream.
#[async_trait]
pub trait StreamSender: Send + Sync {
    /// Send `message` to `to`. Waits for capacity when the stream is full.
    async fn send(&self, message: Message, to: &Address) -> Result<(), TransportError>;
}

/// Receiving half of a duplex stream.
#[async_trait]
pub trait StreamReceiver: Send {
    /// Next message and its sender. `Closed` once the remote end is done.
    async fn recv(&mut self) -> Result<(Address, Message), TransportError>;
}

/// Point-to-point transport.
#[async_trait]
pub trait Network: Send + Sync {
    /// One-shot call; the reply is whatever the remote handler returned.
    async fn call(&self, to: &Address, message: Message)
        -> Result<Option<Message>, TransportError>;

    /// Open a duplex stream to `to`.
    async fn open_stream(
        &self,
        to: &Address,
    ) -> Result<(Box<dyn StreamSender>, Box<dyn StreamReceiver>), TransportError>;
}
