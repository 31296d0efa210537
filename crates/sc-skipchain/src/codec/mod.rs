//! # Block Codec
//!
//! Wire form of blocks and chains (bincode), with tamper detection on decode:
//! a decoded block is only returned once its payload hash and header hash
//! have been recomputed and matched.

use std::sync::Arc;

use shared_types::BlockResponse;

use crate::domain::{Chain, CodecError, SkipBlock};
use crate::ports::outbound::CollectiveCrypto;

/// Encodes and validates blocks and chains.
pub struct BlockCodec<C: CollectiveCrypto> {
    crypto: Arc<C>,
    max_size: usize,
}

impl<C: CollectiveCrypto> BlockCodec<C> {
    /// Create a codec rejecting inputs larger than `max_size` bytes.
    pub fn new(crypto: Arc<C>, max_size: usize) -> Self {
        Self { crypto, max_size }
    }

    /// Decode and validate a block.
    pub fn decode_block(&self, bytes: &[u8]) -> Result<SkipBlock, CodecError> {
        self.check_size(bytes)?;
        let block: SkipBlock =
            bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;

        let index = block.index();
        if self.crypto.hash(&block.payload) != block.header.payload_hash {
            return Err(CodecError::PayloadMismatch { index });
        }
        let computed = block.header.hash_with(self.crypto.as_ref());
        if computed != block.hash {
            return Err(CodecError::HashMismatch {
                index,
                claimed: block.hash,
                computed,
            });
        }
        Ok(block)
    }

    pub fn encode_block(&self, block: &SkipBlock) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(block).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn encode_chain(&self, chain: &Chain) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(chain).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decode a chain. Links are not verified here; that is the engine's job.
    pub fn decode_chain(&self, bytes: &[u8]) -> Result<Chain, CodecError> {
        self.check_size(bytes)?;
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// Build the streamed response for `block`.
    ///
    /// Genesis never carries a chain; any other block must.
    pub fn pack_response(
        &self,
        block: &SkipBlock,
        chain: Option<&Chain>,
    ) -> Result<BlockResponse, CodecError> {
        let chain = if block.is_genesis() {
            None
        } else {
            let chain = chain.ok_or(CodecError::MissingChain {
                index: block.index(),
            })?;
            Some(self.encode_chain(chain)?)
        };
        Ok(BlockResponse {
            block: self.encode_block(block)?,
            chain,
        })
    }

    fn check_size(&self, bytes: &[u8]) -> Result<(), CodecError> {
        if bytes.len() > self.max_size {
            return Err(CodecError::TooLarge {
                size: bytes.len(),
                limit: self.max_size,
            });
        }
        Ok(())
    }
}
