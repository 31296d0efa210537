//! # Consensus Chain Engine
//!
//! Produces and verifies chains of authority-transition proofs.
//!
//! A chain between two stored blocks holds one link per authority rotation
//! plus a final link for the target. Link `n` is signed by the authority
//! recorded at the target of link `n - 1` (the anchor's authority for link 0),
//! and carries the target header so the verifier learns who signs next.
//!
//! ```text
//! anchor ──(A0 signs)──► b3 [A1] ──(A1 signs)──► b7 [A2] ──(A2 signs)──► target
//! ```
//!
//! Chains are rebuilt from stored blocks on every request.

use std::sync::Arc;

use shared_types::Digest;
use tracing::{debug, warn};

use crate::domain::{Chain, ChainError, Link, SkipBlock, StoreError};
use crate::ports::outbound::{BlockLog, CollectiveCrypto};
use crate::store::BlockStore;

/// Builds and checks consensus chains against the local store.
pub struct ChainEngine<L: BlockLog, C: CollectiveCrypto> {
    store: Arc<BlockStore<L>>,
    crypto: Arc<C>,
}

impl<L: BlockLog, C: CollectiveCrypto> ChainEngine<L, C> {
    pub fn new(store: Arc<BlockStore<L>>, crypto: Arc<C>) -> Self {
        Self { store, crypto }
    }

    /// Chain from genesis to `target`.
    pub fn chain_to(&self, target: &Digest) -> Result<Chain, ChainError> {
        let genesis = self
            .store
            .genesis()
            .ok_or(ChainError::NotFound { hash: *target })?;
        self.chain_between(&genesis.hash, target)
    }

    /// Chain from the stored block `from` to the stored block `to`.
    ///
    /// Empty when `from == to`.
    pub fn chain_between(&self, from: &Digest, to: &Digest) -> Result<Chain, ChainError> {
        let from_block = self.lookup(from)?;
        let to_block = self.lookup(to)?;
        let (start, end) = (from_block.index(), to_block.index());
        if start > end {
            return Err(ChainError::InvalidRange {
                from: start,
                to: end,
            });
        }

        let mut chain = Chain::default();
        let mut anchor = from_block.hash;
        let mut previous = from_block;
        for index in start + 1..=end {
            let block = if index == end {
                to_block.clone()
            } else {
                self.store.read(index)?
            };
            if index == end || block.authority() != previous.authority() {
                let signature = block
                    .signature
                    .clone()
                    .ok_or(ChainError::MissingSignature { index })?;
                chain.push(Link {
                    from: anchor,
                    to: block.hash,
                    header: block.header.clone(),
                    authority: previous.authority().clone(),
                    signature,
                });
                anchor = block.hash;
            }
            previous = block;
        }

        debug!(
            "[sc-chain] Built {} link(s) from block {} to block {}",
            chain.len(),
            start,
            end
        );
        Ok(chain)
    }

    /// Verify `chain` starting from the locally stored `anchor`.
    ///
    /// Stops at the first broken link. Returns the hash the chain proves.
    pub fn verify(&self, chain: &Chain, anchor: &Digest) -> Result<Digest, ChainError> {
        if chain.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        let anchor_block = self.lookup(anchor)?;

        let mut trusted = anchor_block.authority().clone();
        let mut cursor = anchor_block.hash;
        let mut height = anchor_block.index();

        for (position, link) in chain.iter().enumerate() {
            if link.from != cursor {
                return Err(reject(position, "link does not start at the trusted block"));
            }
            if link.authority != trusted {
                return Err(reject(position, "signing roster is not the trusted authority"));
            }
            if link.header.index <= height {
                return Err(reject(position, "index does not advance"));
            }
            if link.header.hash_with(self.crypto.as_ref()) != link.to {
                return Err(reject(position, "header does not hash to link target"));
            }

            let key = self
                .crypto
                .aggregate_public_key(&link.authority)
                .map_err(|e| reject(position, e.to_string()))?;
            self.crypto
                .verify(&key, link.to.as_ref(), &link.signature)
                .map_err(|e| reject(position, e.to_string()))?;

            trusted = link.header.authority.clone();
            cursor = link.to;
            height = link.header.index;
        }

        debug!(
            "[sc-chain] Verified {} link(s) up to block {} ({})",
            chain.len(),
            height,
            cursor.short()
        );
        Ok(cursor)
    }

    /// Verify that `chain` leads from `anchor` exactly to `target`.
    ///
    /// An empty chain is only accepted when `target` is the anchor itself.
    pub fn verify_to(
        &self,
        chain: &Chain,
        anchor: &Digest,
        target: &Digest,
    ) -> Result<(), ChainError> {
        if chain.is_empty() {
            return if anchor == target {
                Ok(())
            } else {
                Err(ChainError::EmptyChain)
            };
        }
        let reached = self.verify(chain, anchor)?;
        if reached != *target {
            return Err(reject(
                chain.len() - 1,
                format!("chain ends at {}, expected {}", reached.short(), target.short()),
            ));
        }
        Ok(())
    }

    fn lookup(&self, hash: &Digest) -> Result<Arc<SkipBlock>, ChainError> {
        self.store.read_by_hash(hash).map_err(|e| match e {
            StoreError::HashNotFound { hash } => ChainError::NotFound { hash },
            other => ChainError::Store(other),
        })
    }
}

fn reject(position: usize, reason: impl Into<String>) -> ChainError {
    let err = ChainError::invalid(position, reason);
    warn!("[sc-chain] Rejected proof: {}", err);
    err
}
