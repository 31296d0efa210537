//! # Skipchain Service
//!
//! Wires one local chain: store, chain engine and codec share the same
//! crypto backend, and every protocol role is built from them.

use std::sync::Arc;

use tracing::info;

use crate::adapters::log::{FileLog, MemoryLog};
use crate::codec::BlockCodec;
use crate::config::SkipchainConfig;
use crate::consensus::ChainEngine;
use crate::domain::{Roster, SkipBlock, StoreError};
use crate::ports::outbound::{BlockLog, CollectiveCrypto};
use crate::replication::{CatchUp, GenesisPropagator, ReplicationHandler};
use crate::store::BlockStore;

/// One participant's skipchain.
pub struct SkipchainService<L: BlockLog, C: CollectiveCrypto> {
    config: SkipchainConfig,
    crypto: Arc<C>,
    store: Arc<BlockStore<L>>,
    engine: Arc<ChainEngine<L, C>>,
    codec: Arc<BlockCodec<C>>,
}

impl<L: BlockLog, C: CollectiveCrypto> SkipchainService<L, C> {
    /// Open over `log`, replaying whatever it already holds.
    pub fn open(config: SkipchainConfig, log: L, crypto: Arc<C>) -> Result<Self, StoreError> {
        let store = Arc::new(BlockStore::open(log)?);
        let engine = Arc::new(ChainEngine::new(store.clone(), crypto.clone()));
        let codec = Arc::new(BlockCodec::new(crypto.clone(), config.max_block_size));
        Ok(Self {
            config,
            crypto,
            store,
            engine,
            codec,
        })
    }

    pub fn config(&self) -> &SkipchainConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<BlockStore<L>> {
        &self.store
    }

    pub fn engine(&self) -> &Arc<ChainEngine<L, C>> {
        &self.engine
    }

    pub fn codec(&self) -> &Arc<BlockCodec<C>> {
        &self.codec
    }

    /// Serving side, ready to register with a transport.
    pub fn handler(&self) -> Arc<ReplicationHandler<L, C>> {
        Arc::new(ReplicationHandler::new(
            self.store.clone(),
            self.engine.clone(),
            self.codec.clone(),
        ))
    }

    /// Requesting side.
    pub fn catch_up(&self) -> CatchUp<L, C> {
        CatchUp::new(self.store.clone(), self.engine.clone(), self.codec.clone())
    }

    pub fn propagator(&self) -> GenesisPropagator<C> {
        GenesisPropagator::new(self.codec.clone())
    }

    /// Create and store the genesis block.
    pub fn create_genesis(
        &self,
        authority: Roster,
        payload: Vec<u8>,
    ) -> Result<SkipBlock, StoreError> {
        let genesis = SkipBlock::genesis(self.crypto.as_ref(), authority, payload);
        self.store.insert(genesis.clone())?;
        info!("[sc-store] 🌱 Created genesis {}", genesis.hash.short());
        Ok(genesis)
    }

    /// Unsigned block extending the local head.
    ///
    /// The previous block's authority signs its hash before `append`.
    pub fn next_block(&self, authority: Roster, payload: Vec<u8>) -> Result<SkipBlock, StoreError> {
        let head = self.store.last().ok_or(StoreError::NotFound { index: 0 })?;
        Ok(SkipBlock::seal(
            self.crypto.as_ref(),
            head.index() + 1,
            head.hash,
            authority,
            payload,
        ))
    }

    /// Store a signed block.
    pub fn append(&self, block: SkipBlock) -> Result<(), StoreError> {
        self.store.insert(block)
    }
}

impl<C: CollectiveCrypto> SkipchainService<MemoryLog, C> {
    /// Service whose blocks live only in memory.
    pub fn in_memory(config: SkipchainConfig, crypto: Arc<C>) -> Result<Self, StoreError> {
        Self::open(config, MemoryLog::new(), crypto)
    }
}

impl<C: CollectiveCrypto> SkipchainService<FileLog, C> {
    /// Service backed by `blocks.log` in `config.data_dir`.
    pub fn on_disk(config: SkipchainConfig, crypto: Arc<C>) -> Result<Self, StoreError> {
        let dir = config
            .data_dir
            .clone()
            .ok_or_else(|| StoreError::Log("no data directory configured".into()))?;
        let log = FileLog::in_dir(&dir)?;
        Self::open(config, log, crypto)
    }
}
