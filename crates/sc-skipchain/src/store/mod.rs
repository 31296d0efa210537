//! # Block Store
//!
//! Ordered, indexed, append-only block storage. The single source of truth
//! for the local chain.
//!
//! ## Invariants
//!
//! | Invariant | Enforced by |
//! |-----------|-------------|
//! | Indices are gapless from 0 | `insert` rejects `index != len` |
//! | Hashes are unique | hash index checked before append |
//! | Each block points at its predecessor | `previous_hash` check |
//! | Published blocks are durable | log append happens before publish |
//!
//! Writers are serialized by the log mutex. Readers only take the state
//! read lock, so a slow log append never blocks `read`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use shared_types::Digest;
use tracing::{debug, info};

use crate::domain::{SkipBlock, StoreError};
use crate::ports::outbound::BlockLog;

#[derive(Default)]
struct StoreState {
    blocks: Vec<Arc<SkipBlock>>,
    by_hash: HashMap<Digest, u64>,
}

impl StoreState {
    fn len(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Checks `block` may be appended next.
    fn check_append(&self, block: &SkipBlock) -> Result<(), StoreError> {
        let index = block.index();
        let expected = self.len();
        if index != expected {
            return Err(StoreError::OutOfOrder {
                expected,
                got: index,
            });
        }
        if let Some(&existing) = self.by_hash.get(&block.hash) {
            return Err(StoreError::Duplicate {
                index: existing,
                hash: block.hash,
            });
        }
        let expected_previous = match self.blocks.last() {
            Some(last) => last.hash,
            None => Digest::ZERO,
        };
        if *block.previous_hash() != expected_previous {
            return Err(StoreError::Linkage {
                index,
                expected: expected_previous,
                got: *block.previous_hash(),
            });
        }
        if index > 0 && block.hash.is_zero() {
            return Err(StoreError::ZeroHash { index });
        }
        Ok(())
    }

    fn publish(&mut self, block: SkipBlock) {
        let index = self.len();
        self.by_hash.insert(block.hash, index);
        self.blocks.push(Arc::new(block));
    }
}

/// Append-only block store over a `BlockLog`.
pub struct BlockStore<L: BlockLog> {
    log: Mutex<L>,
    state: RwLock<StoreState>,
}

impl<L: BlockLog> BlockStore<L> {
    /// Open a store, replaying every block already in `log`.
    ///
    /// Each replayed block is checked exactly as an insert would be.
    pub fn open(mut log: L) -> Result<Self, StoreError> {
        let mut state = StoreState::default();
        for block in log.load()? {
            state.check_append(&block)?;
            state.publish(block);
        }
        if state.len() > 0 {
            info!("[sc-store] 💾 Replayed {} block(s) from log", state.len());
        }
        Ok(Self {
            log: Mutex::new(log),
            state: RwLock::new(state),
        })
    }

    /// Block at `index`.
    pub fn read(&self, index: u64) -> Result<Arc<SkipBlock>, StoreError> {
        let state = self.state.read();
        usize::try_from(index)
            .ok()
            .and_then(|i| state.blocks.get(i))
            .cloned()
            .ok_or(StoreError::NotFound { index })
    }

    /// Block with `hash`.
    pub fn read_by_hash(&self, hash: &Digest) -> Result<Arc<SkipBlock>, StoreError> {
        let state = self.state.read();
        state
            .by_hash
            .get(hash)
            .and_then(|&i| state.blocks.get(i as usize))
            .cloned()
            .ok_or(StoreError::HashNotFound { hash: *hash })
    }

    /// Index of the block with `hash`.
    pub fn index_of(&self, hash: &Digest) -> Option<u64> {
        self.state.read().by_hash.get(hash).copied()
    }

    /// Append the next block. Durable once this returns `Ok`.
    pub fn insert(&self, block: SkipBlock) -> Result<(), StoreError> {
        let mut log = self.log.lock();
        self.state.read().check_append(&block)?;
        log.append(&block)?;

        let index = block.index();
        let hash = block.hash;
        self.state.write().publish(block);
        debug!("[sc-store] Stored block {} ({})", index, hash.short());
        Ok(())
    }

    /// Number of stored blocks.
    pub fn len(&self) -> u64 {
        self.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent block.
    pub fn last(&self) -> Option<Arc<SkipBlock>> {
        self.state.read().blocks.last().cloned()
    }

    /// Block 0.
    pub fn genesis(&self) -> Option<Arc<SkipBlock>> {
        self.state.read().blocks.first().cloned()
    }
}
