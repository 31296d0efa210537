//! # Replication Handler
//!
//! Serving side of the protocol:
//!
//! - `PropagateGenesis` (one-shot): install the genesis block, idempotently
//! - `BlockRequest` (stream): stream every block from genesis up to the
//!   requested hash, each with the chain proving it
//!
//! The handler keeps no per-request state beyond the stream cursor.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{Address, Message};
use tracing::{debug, info, warn};

use super::Cancellation;
use crate::codec::BlockCodec;
use crate::consensus::ChainEngine;
use crate::domain::{ReplicationError, SkipBlock, StoreError};
use crate::ports::inbound::MessageHandler;
use crate::ports::outbound::{BlockLog, CollectiveCrypto, StreamReceiver, StreamSender};
use crate::store::BlockStore;

/// Protocol surface over one local chain.
pub struct ReplicationHandler<L: BlockLog, C: CollectiveCrypto> {
    store: Arc<BlockStore<L>>,
    engine: Arc<ChainEngine<L, C>>,
    codec: Arc<BlockCodec<C>>,
}

impl<L: BlockLog, C: CollectiveCrypto> ReplicationHandler<L, C> {
    pub fn new(
        store: Arc<BlockStore<L>>,
        engine: Arc<ChainEngine<L, C>>,
        codec: Arc<BlockCodec<C>>,
    ) -> Self {
        Self {
            store,
            engine,
            codec,
        }
    }

    /// Install a genesis block received from `from`.
    ///
    /// Succeeds without change if the same genesis is already stored.
    pub fn accept_genesis(&self, from: &Address, bytes: &[u8]) -> Result<(), ReplicationError> {
        let block = self.codec.decode_block(bytes)?;
        if !block.is_genesis() {
            return Err(ReplicationError::Protocol(format!(
                "genesis must have index 0, got {}",
                block.index()
            )));
        }

        if let Some(existing) = self.store.genesis() {
            return same_genesis(&existing, &block);
        }

        let hash = block.hash;
        match self.store.insert(block.clone()) {
            Ok(()) => {
                info!(
                    "[sc-replication] 🌱 Installed genesis {} from {}",
                    hash.short(),
                    from
                );
                Ok(())
            }
            // Lost a race against a concurrent install; compare with the winner.
            Err(StoreError::OutOfOrder { .. }) | Err(StoreError::Duplicate { .. }) => {
                match self.store.genesis() {
                    Some(existing) => same_genesis(&existing, &block),
                    None => Err(ReplicationError::Protocol(
                        "genesis vanished after concurrent insert".into(),
                    )),
                }
            }
            Err(e) => Err(ReplicationError::Store(e)),
        }
    }

    /// Stream blocks `0..=target` to the requester.
    async fn serve(
        &self,
        out: &dyn StreamSender,
        input: &mut dyn StreamReceiver,
        cancellation: &Cancellation,
    ) -> Result<(), ReplicationError> {
        let received = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(ReplicationError::Cancelled),
            received = input.recv() => received,
        };
        let (requester, message) = received.map_err(|e| {
            ReplicationError::Protocol(format!("stream ended before a block request: {}", e))
        })?;
        let request = match message {
            Message::BlockRequest(request) => request,
            other => {
                return Err(ReplicationError::Protocol(format!(
                    "expected BlockRequest, got {}",
                    other.kind()
                )))
            }
        };
        debug!(
            "[sc-replication] {} requested blocks up to {}",
            requester,
            request.to.short()
        );

        let mut index = 0u64;
        loop {
            if cancellation.is_cancelled() {
                return Err(ReplicationError::Cancelled);
            }
            let horizon = self.store.len();
            if index >= horizon {
                warn!(
                    "[sc-replication] {} asked for unknown block {}",
                    requester,
                    request.to.short()
                );
                return Err(ReplicationError::NotFound {
                    target: request.to,
                    horizon,
                });
            }

            let block = self
                .store
                .read(index)
                .map_err(|source| ReplicationError::Read { index, source })?;
            let chain = if block.is_genesis() {
                None
            } else {
                Some(self.engine.chain_to(&block.hash)?)
            };
            let response = self.codec.pack_response(&block, chain.as_ref())?;

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(ReplicationError::Cancelled),
                sent = out.send(response.into(), &requester) => {
                    sent.map_err(|source| ReplicationError::Send { index, source })?
                }
            }
            debug!("[sc-replication] Sent block {} to {}", index, requester);

            if block.hash == request.to {
                info!(
                    "[sc-replication] Served {} block(s) to {}",
                    index + 1,
                    requester
                );
                return Ok(());
            }
            index += 1;
        }
    }
}

fn same_genesis(existing: &SkipBlock, received: &SkipBlock) -> Result<(), ReplicationError> {
    if existing.hash == received.hash {
        Ok(())
    } else {
        warn!(
            "[sc-replication] Rejected conflicting genesis {} (have {})",
            received.hash.short(),
            existing.hash.short()
        );
        Err(ReplicationError::Conflict {
            index: 0,
            stored: existing.hash,
            received: received.hash,
        })
    }
}

#[async_trait]
impl<L, C> MessageHandler for ReplicationHandler<L, C>
where
    L: BlockLog + 'static,
    C: CollectiveCrypto + 'static,
{
    async fn process(
        &self,
        from: &Address,
        message: Message,
    ) -> Result<Option<Message>, ReplicationError> {
        match message {
            Message::PropagateGenesis(msg) => {
                self.accept_genesis(from, &msg.genesis)?;
                Ok(None)
            }
            other => Err(ReplicationError::Protocol(format!(
                "unsupported message {}",
                other.kind()
            ))),
        }
    }

    async fn stream(
        &self,
        out: Box<dyn StreamSender>,
        mut input: Box<dyn StreamReceiver>,
        cancellation: Cancellation,
    ) -> Result<(), ReplicationError> {
        self.serve(out.as_ref(), input.as_mut(), &cancellation).await
    }
}
