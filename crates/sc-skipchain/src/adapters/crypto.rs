//! # BLS Collective Crypto
//!
//! SHA-256 block hashing and BLS12-381 aggregate signatures.
//!
//! - `BlsCollectiveCrypto`: the `CollectiveCrypto` port
//! - `CollectiveSigner`: holds every member key of one roster and produces
//!   the aggregate signature the roster would agree on

use shared_crypto::{sha256, BlsKeyPair, BlsPublicKey, BlsSignature, CryptoError};
use shared_types::{Address, Digest};

use crate::domain::{Authority, Member, Roster};
use crate::ports::outbound::{AggregateKey, CollectiveCrypto};

/// BLS implementation of the crypto port.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlsCollectiveCrypto;

impl BlsCollectiveCrypto {
    pub fn new() -> Self {
        Self
    }
}

impl CollectiveCrypto for BlsCollectiveCrypto {
    fn hash(&self, data: &[u8]) -> Digest {
        Digest::new(sha256(data))
    }

    fn aggregate_public_key(&self, authority: &dyn Authority) -> Result<AggregateKey, CryptoError> {
        let keys = authority
            .members()
            .into_iter()
            .map(|m| BlsPublicKey::from_slice(&m.public_key))
            .collect::<Result<Vec<_>, _>>()?;
        let aggregate = BlsPublicKey::aggregate(&keys)?;
        Ok(AggregateKey(aggregate.to_bytes().to_vec()))
    }

    fn verify(
        &self,
        key: &AggregateKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        let key = BlsPublicKey::from_slice(&key.0)?;
        let signature = BlsSignature::from_slice(signature)?;
        key.verify(message, &signature)
    }
}

/// Every key pair of one roster, for producing collective signatures locally.
pub struct CollectiveSigner {
    members: Vec<(Address, BlsKeyPair)>,
}

impl CollectiveSigner {
    pub fn new(members: Vec<(Address, BlsKeyPair)>) -> Self {
        Self { members }
    }

    /// Fresh random keys for each address.
    pub fn generate(addresses: impl IntoIterator<Item = Address>) -> Result<Self, CryptoError> {
        let members = addresses
            .into_iter()
            .map(|addr| BlsKeyPair::generate().map(|kp| (addr, kp)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { members })
    }

    /// Keys derived from `seed` and each address, reproducible across runs.
    pub fn from_seed(
        seed: u64,
        addresses: impl IntoIterator<Item = Address>,
    ) -> Result<Self, CryptoError> {
        let members = addresses
            .into_iter()
            .map(|addr| {
                let mut ikm = [0u8; 32];
                ikm[..8].copy_from_slice(&seed.to_le_bytes());
                ikm[8..].copy_from_slice(&sha256(addr.as_str().as_bytes())[..24]);
                BlsKeyPair::from_seed(&ikm).map(|kp| (addr, kp))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { members })
    }

    /// The public roster these keys make up.
    pub fn roster(&self) -> Roster {
        self.members
            .iter()
            .map(|(addr, kp)| Member::new(addr.clone(), kp.public_key().to_bytes().to_vec()))
            .collect()
    }

    /// Aggregate signature of every member over `message`.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signatures: Vec<BlsSignature> =
            self.members.iter().map(|(_, kp)| kp.sign(message)).collect();
        Ok(BlsSignature::aggregate(&signatures)?.to_bytes().to_vec())
    }

    /// Aggregate signature of the first `count` members only.
    ///
    /// Does not verify against the full roster; useful to exercise rejection.
    pub fn sign_partial(&self, message: &[u8], count: usize) -> Result<Vec<u8>, CryptoError> {
        let signatures: Vec<BlsSignature> = self
            .members
            .iter()
            .take(count)
            .map(|(_, kp)| kp.sign(message))
            .collect();
        Ok(BlsSignature::aggregate(&signatures)?.to_bytes().to_vec())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
