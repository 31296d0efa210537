//! # Catch-up (requesting side)
//!
//! Pulls blocks from a peer up to a target hash, verifying each block's chain
//! against the local genesis before storing it.
//!
//! On failure, every block verified so far stays stored; a later catch-up
//! skips them.

use std::sync::Arc;

use shared_types::{Address, BlockRequest, BlockResponse, Digest, Message, TransportError};
use tracing::{debug, info, warn};

use crate::codec::BlockCodec;
use crate::consensus::ChainEngine;
use crate::domain::{ChainError, ReplicationError, SkipBlock};
use crate::ports::outbound::{BlockLog, CollectiveCrypto, Network};
use crate::store::BlockStore;

/// Outcome of a finished catch-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchUpReport {
    /// Hash that was requested and reached.
    pub target: Digest,
    /// Responses received.
    pub received: u64,
    /// Blocks newly stored.
    pub inserted: u64,
    /// Blocks already held locally.
    pub skipped: u64,
}

enum Accepted {
    Inserted,
    Skipped,
}

/// Drives a catch-up stream against one peer.
pub struct CatchUp<L: BlockLog, C: CollectiveCrypto> {
    store: Arc<BlockStore<L>>,
    engine: Arc<ChainEngine<L, C>>,
    codec: Arc<BlockCodec<C>>,
}

impl<L: BlockLog, C: CollectiveCrypto> CatchUp<L, C> {
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

    /// Fetch and store every block from `peer` up to and including `target`.
    pub async fn catch_up(
        &self,
        network: &dyn Network,
        peer: &Address,
        target: Digest,
    ) -> Result<CatchUpReport, ReplicationError> {
        let (sender, mut receiver) = network.open_stream(peer).await?;
        sender
            .send(BlockRequest { to: target }.into(), peer)
            .await?;
        debug!(
            "[sc-replication] Requested blocks up to {} from {}",
            target.short(),
            peer
        );

        let mut report = CatchUpReport {
            target,
            received: 0,
            inserted: 0,
            skipped: 0,
        };
        loop {
            let response = match receiver.recv().await {
                Ok((_, Message::BlockResponse(response))) => response,
                Ok((_, other)) => {
                    return Err(ReplicationError::Protocol(format!(
                        "expected BlockResponse, got {}",
                        other.kind()
                    )))
                }
                Err(cause) => {
                    return Err(incomplete(target, report.received, cause));
                }
            };
            report.received += 1;

            let block = self.codec.decode_block(&response.block)?;
            let hash = block.hash;
            match self.accept(block, &response)? {
                Accepted::Inserted => report.inserted += 1,
                Accepted::Skipped => report.skipped += 1,
            }

            if hash == target {
                info!(
                    "[sc-replication] ✅ Caught up to {} from {} ({} new, {} known)",
                    target.short(),
                    peer,
                    report.inserted,
                    report.skipped
                );
                return Ok(report);
            }
        }
    }

    fn accept(
        &self,
        block: SkipBlock,
        response: &BlockResponse,
    ) -> Result<Accepted, ReplicationError> {
        if block.is_genesis() {
            if response.chain.is_some() {
                return Err(ReplicationError::Protocol(
                    "genesis response carries a chain".into(),
                ));
            }
            return match self.store.genesis() {
                Some(existing) => self.compare(&existing, &block),
                None => {
                    warn!(
                        "[sc-replication] No local genesis; trusting {} on first use",
                        block.hash.short()
                    );
                    self.store.insert(block)?;
                    Ok(Accepted::Inserted)
                }
            };
        }

        let index = block.index();
        let chain_bytes = response
            .chain
            .as_ref()
            .ok_or_else(|| ReplicationError::Protocol(format!("block {} has no chain", index)))?;
        let chain = self.codec.decode_chain(chain_bytes)?;
        let genesis = self.store.genesis().ok_or_else(|| {
            ReplicationError::Protocol(format!("block {} arrived before genesis", index))
        })?;

        self.engine.verify_to(&chain, &genesis.hash, &block.hash)?;
        let last = chain.links().last();
        if block.signature.as_ref() != last.map(|link| &link.signature) {
            return Err(ReplicationError::Protocol(format!(
                "signature of block {} differs from its proof",
                index
            )));
        }

        match self.store.read(index) {
            Ok(existing) => self.compare(&existing, &block),
            Err(_) => {
                // The proof may skip over the predecessor, so its signer is
                // checked against the authority actually stored there.
                if let Ok(previous) = self.store.read(index - 1) {
                    if last.map(|link| &link.authority) != Some(previous.authority()) {
                        let err = ChainError::invalid(
                            chain.len() - 1,
                            format!(
                                "block {} is not signed by the authority of block {}",
                                index,
                                index - 1
                            ),
                        );
                        warn!("[sc-replication] Rejected block {}: {}", index, err);
                        return Err(err.into());
                    }
                }
                self.store.insert(block)?;
                debug!("[sc-replication] Stored verified block {}", index);
                Ok(Accepted::Inserted)
            }
        }
    }

    fn compare(&self, existing: &SkipBlock, received: &SkipBlock) -> Result<Accepted, ReplicationError> {
        if existing.hash == received.hash {
            Ok(Accepted::Skipped)
        } else {
            warn!(
                "[sc-replication] Conflict at index {}: have {}, peer sent {}",
                existing.index(),
                existing.hash.short(),
                received.hash.short()
            );
            Err(ReplicationError::Conflict {
                index: existing.index(),
                stored: existing.hash,
                received: received.hash,
            })
        }
    }
}

fn incomplete(target: Digest, received: u64, cause: TransportError) -> ReplicationError {
    warn!(
        "[sc-replication] Catch-up to {} ended after {} block(s): {}",
        target.short(),
        received,
        cause
    );
    ReplicationError::Incomplete {
        target,
        received,
        cause,
    }
}
