use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use shared_crypto::CryptoError;
use shared_types::{Address, Digest};

use crate::adapters::crypto::{BlsCollectiveCrypto, CollectiveSigner};
use crate::adapters::log::MemoryLog;
use crate::config::SkipchainConfig;
use crate::domain::{Authority, SkipBlock, StoreError};
use crate::ports::outbound::{AggregateKey, BlockLog, CollectiveCrypto};
use crate::service::SkipchainService;
use crate::store::BlockStore;

/// Members per test authority.
pub const TEST_AUTHORITY_SIZE: usize = 3;

/// Deterministic signer for authority number `epoch`.
pub fn test_signer(epoch: u64) -> CollectiveSigner {
    let addresses = (0..TEST_AUTHORITY_SIZE).map(|i| Address::new(format!("member-{}-{}", epoch, i)));
    CollectiveSigner::from_seed(epoch, addresses).expect("seeded keys")
}

/// A fully signed chain of blocks.
///
/// Block `k` carries authority `k / rotate_every` and, past genesis, is
/// signed by the authority of block `k - 1`. `rotate_every == 0` never
/// rotates.
pub struct TestChain {
    pub crypto: Arc<BlsCollectiveCrypto>,
    pub signers: Vec<CollectiveSigner>,
    pub blocks: Vec<SkipBlock>,
    rotate_every: usize,
}

impl TestChain {
    pub fn build(count: usize, rotate_every: usize) -> Self {
        let crypto = Arc::new(BlsCollectiveCrypto::new());
        let epochs = if count == 0 {
            0
        } else {
            epoch_of(count - 1, rotate_every) + 1
        };
        let signers: Vec<CollectiveSigner> = (0..epochs as u64).map(test_signer).collect();

        let mut blocks: Vec<SkipBlock> = Vec::with_capacity(count);
        for index in 0..count {
            let authority = signers[epoch_of(index, rotate_every)].roster();
            let payload = format!("block-{}", index).into_bytes();
            let block = match blocks.last() {
                None => SkipBlock::genesis(crypto.as_ref(), authority, payload),
                Some(previous) => {
                    let unsigned = SkipBlock::seal(
                        crypto.as_ref(),
                        index as u64,
                        previous.hash,
                        authority,
                        payload,
                    );
                    let signer = &signers[epoch_of(index - 1, rotate_every)];
                    let signature = signer.sign(unsigned.hash.as_bytes()).expect("sign");
                    unsigned.with_signature(signature)
                }
            };
            blocks.push(block);
        }

        Self {
            crypto,
            signers,
            blocks,
            rotate_every,
        }
    }

    pub fn hash(&self, index: usize) -> Digest {
        self.blocks[index].hash
    }

    /// Signer whose roster is recorded in block `index`.
    pub fn signer_at(&self, index: usize) -> &CollectiveSigner {
        &self.signers[epoch_of(index, self.rotate_every)]
    }

    /// Store holding the first `count` blocks.
    pub fn store_with(&self, count: usize) -> Arc<BlockStore<MemoryLog>> {
        let log = MemoryLog::with_blocks(self.blocks[..count].to_vec());
        Arc::new(BlockStore::open(log).expect("valid test chain"))
    }

    /// Store holding every block.
    pub fn store(&self) -> Arc<BlockStore<MemoryLog>> {
        self.store_with(self.blocks.len())
    }

    /// In-memory service over the first `count` blocks.
    pub fn service_with(
        &self,
        config: SkipchainConfig,
        count: usize,
    ) -> SkipchainService<MemoryLog, BlsCollectiveCrypto> {
        let log = MemoryLog::with_blocks(self.blocks[..count].to_vec());
        SkipchainService::open(config, log, self.crypto.clone()).expect("valid test chain")
    }
}

fn epoch_of(index: usize, rotate_every: usize) -> usize {
    if rotate_every == 0 {
        0
    } else {
        index / rotate_every
    }
}

/// Crypto wrapper counting every call, for asserting verification effort.
pub struct RecordingCrypto<C: CollectiveCrypto = BlsCollectiveCrypto> {
    inner: C,
    hashes: AtomicUsize,
    aggregations: AtomicUsize,
    verifications: AtomicUsize,
}

impl<C: CollectiveCrypto> RecordingCrypto<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            hashes: AtomicUsize::new(0),
            aggregations: AtomicUsize::new(0),
            verifications: AtomicUsize::new(0),
        }
    }

    pub fn hashes(&self) -> usize {
        self.hashes.load(Ordering::SeqCst)
    }

    pub fn aggregations(&self) -> usize {
        self.aggregations.load(Ordering::SeqCst)
    }

    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }
}

impl<C: CollectiveCrypto> CollectiveCrypto for RecordingCrypto<C> {
    fn hash(&self, data: &[u8]) -> Digest {
        self.hashes.fetch_add(1, Ordering::SeqCst);
        self.inner.hash(data)
    }

    fn aggregate_public_key(&self, authority: &dyn Authority) -> Result<AggregateKey, CryptoError> {
        self.aggregations.fetch_add(1, Ordering::SeqCst);
        self.inner.aggregate_public_key(authority)
    }

    fn verify(
        &self,
        key: &AggregateKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(key, message, signature)
    }
}

/// Log that accepts `remaining` appends and then fails every one.
#[derive(Debug, Default)]
pub struct FailingLog {
    pub remaining: usize,
}

impl BlockLog for FailingLog {
    fn load(&mut self) -> Result<Vec<SkipBlock>, StoreError> {
        Ok(Vec::new())
    }

    fn append(&mut self, _block: &SkipBlock) -> Result<(), StoreError> {
        if self.remaining == 0 {
            return Err(StoreError::Log("disk full".into()));
        }
        self.remaining -= 1;
        Ok(())
    }
}
