//! # Domain Errors
//!
//! One error enum per layer. Every variant carries the index or hash it is
//! about so a failure can be traced back to a block.

use shared_types::{Address, Digest, TransportError};
use thiserror::Error;

/// Errors decoding or encoding wire bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Bytes are not a valid encoding.
    #[error("Malformed encoding: {0}")]
    Decode(String),

    /// Input exceeds the configured limit.
    #[error("Encoded size {size} exceeds limit {limit}")]
    TooLarge { size: usize, limit: usize },

    /// Header hash does not match the claimed block hash.
    #[error("Hash mismatch at index {index}: claimed {claimed}, computed {computed}")]
    HashMismatch {
        index: u64,
        claimed: Digest,
        computed: Digest,
    },

    /// Payload does not hash to the header's payload hash.
    #[error("Payload hash mismatch at index {index}")]
    PayloadMismatch { index: u64 },

    /// A block past genesis was packed without its chain.
    #[error("Chain required for block {index}")]
    MissingChain { index: u64 },

    /// Serialization failed.
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Block store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No block at this index.
    #[error("Block not found at index {index}")]
    NotFound { index: u64 },

    /// No block with this hash.
    #[error("Block not found: {hash}")]
    HashNotFound { hash: Digest },

    /// Inserts must extend the chain by exactly one.
    #[error("Out of order insert: expected index {expected}, got {got}")]
    OutOfOrder { expected: u64, got: u64 },

    /// A block with this hash is already stored.
    #[error("Duplicate block {hash} at index {index}")]
    Duplicate { index: u64, hash: Digest },

    /// `previous_hash` does not point at the stored predecessor.
    #[error("Linkage broken at index {index}: expected previous {expected}, got {got}")]
    Linkage {
        index: u64,
        expected: Digest,
        got: Digest,
    },

    /// Blocks past genesis must not have a zero hash.
    #[error("Zero hash at index {index}")]
    ZeroHash { index: u64 },

    /// The append log failed.
    #[error("Block log error: {0}")]
    Log(String),
}

/// Consensus chain errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// A referenced block is not in the local store.
    #[error("Block not found: {hash}")]
    NotFound { hash: Digest },

    /// A link failed verification.
    #[error("Invalid proof at link {position}: {reason}")]
    InvalidProof { position: usize, reason: String },

    /// Nothing to verify.
    #[error("Empty chain")]
    EmptyChain,

    /// A stored block past genesis has no collective signature.
    #[error("Missing signature on block {index}")]
    MissingSignature { index: u64 },

    /// `from` is after `to`.
    #[error("Invalid range: {from} > {to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ChainError {
    pub(crate) fn invalid(position: usize, reason: impl Into<String>) -> Self {
        ChainError::InvalidProof {
            position,
            reason: reason.into(),
        }
    }
}

/// Replication protocol errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReplicationError {
    /// Received bytes failed to decode or validate.
    #[error("Decode error: {0}")]
    Decode(CodecError),

    /// A different block is already stored at this index.
    #[error("Conflict at index {index}: stored {stored}, received {received}")]
    Conflict {
        index: u64,
        stored: Digest,
        received: Digest,
    },

    /// Unexpected message or missing field.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Reading a block to stream failed.
    #[error("Failed to read block {index}: {source}")]
    Read { index: u64, source: StoreError },

    /// Sending a response failed.
    #[error("Failed to send block {index}: {source}")]
    Send { index: u64, source: TransportError },

    /// The requested target is beyond the local chain.
    #[error("Target {target} not found within {horizon} stored blocks")]
    NotFound { target: Digest, horizon: u64 },

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The stream ended before the target arrived.
    #[error("Catch-up to {target} incomplete after {received} block(s): {cause}")]
    Incomplete {
        target: Digest,
        received: u64,
        cause: TransportError,
    },

    /// The request was cancelled.
    #[error("Cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Some roster members rejected or missed the genesis.
    #[error("Genesis propagation failed for {} member(s)", failures.len())]
    Propagation { failures: Vec<(Address, String)> },
}

impl From<CodecError> for ReplicationError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::MissingChain { index } => {
                ReplicationError::Protocol(format!("chain required for block {}", index))
            }
            other => ReplicationError::Decode(other),
        }
    }
}
