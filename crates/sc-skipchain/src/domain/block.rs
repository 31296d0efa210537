//! # Skipblocks
//!
//! Immutable, content-addressed blocks. The hash covers the canonical header,
//! and the payload is bound to the header through `payload_hash`.

use serde::{Deserialize, Serialize};
use shared_types::Digest;

use super::roster::Roster;
use crate::ports::outbound::CollectiveCrypto;

/// The hashed part of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Position in the chain; genesis is 0.
    pub index: u64,
    /// Hash of block `index - 1`, zero for genesis.
    pub previous_hash: Digest,
    /// Hash of the opaque payload.
    pub payload_hash: Digest,
    /// Roster entitled to co-sign the next block.
    pub authority: Roster,
}

impl BlockHeader {
    /// Deterministic bytes the block hash is computed over.
    ///
    /// `index:u64 LE | previous_hash | payload_hash | roster_len:u32 LE | roster`
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let roster = self.authority.canonical_bytes();
        let mut out = Vec::with_capacity(8 + 32 + 32 + 4 + roster.len());
        out.extend_from_slice(&self.index.to_le_bytes());
        out.extend_from_slice(self.previous_hash.as_bytes());
        out.extend_from_slice(self.payload_hash.as_bytes());
        out.extend_from_slice(&(roster.len() as u32).to_le_bytes());
        out.extend_from_slice(&roster);
        out
    }

    /// Hash of the canonical header.
    pub fn hash_with<C: CollectiveCrypto + ?Sized>(&self, crypto: &C) -> Digest {
        crypto.hash(&self.canonical_bytes())
    }
}

/// A block of the skipchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipBlock {
    pub header: BlockHeader,
    /// Block identity: hash of `header`.
    pub hash: Digest,
    /// Opaque content, only ever hashed.
    pub payload: Vec<u8>,
    /// Aggregate signature over `hash` by the previous block's authority.
    /// Genesis carries none.
    pub signature: Option<Vec<u8>>,
}

impl SkipBlock {
    /// Build an unsigned block, computing payload and header hashes.
    pub fn seal<C: CollectiveCrypto + ?Sized>(
        crypto: &C,
        index: u64,
        previous_hash: Digest,
        authority: Roster,
        payload: Vec<u8>,
    ) -> Self {
        let header = BlockHeader {
            index,
            previous_hash,
            payload_hash: crypto.hash(&payload),
            authority,
        };
        let hash = header.hash_with(crypto);
        Self {
            header,
            hash,
            payload,
            signature: None,
        }
    }

    /// Genesis block for `authority`.
    pub fn genesis<C: CollectiveCrypto + ?Sized>(
        crypto: &C,
        authority: Roster,
        payload: Vec<u8>,
    ) -> Self {
        Self::seal(crypto, 0, Digest::ZERO, authority, payload)
    }

    /// Attach the collective signature.
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn previous_hash(&self) -> &Digest {
        &self.header.previous_hash
    }

    pub fn authority(&self) -> &Roster {
        &self.header.authority
    }

    pub fn is_genesis(&self) -> bool {
        self.header.index == 0
    }
}
