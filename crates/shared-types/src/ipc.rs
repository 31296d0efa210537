//! # Wire Messages
//!
//! Logical schema of the replication protocol, independent of the transport.
//!
//! | Message | Direction | Surface |
//! |---------|-----------|---------|
//! | `PropagateGenesis` | proposer → member | one-shot call |
//! | `BlockRequest` | requester → server | first message of a catch-up stream |
//! | `BlockResponse` | server → requester | one per streamed block |

use crate::entities::Digest;
use serde::{Deserialize, Serialize};

/// Carries the encoded genesis block to a roster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagateGenesis {
    /// Encoded genesis block.
    pub genesis: Vec<u8>,
}

/// Asks a peer to stream every block up to and including `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRequest {
    /// Hash of the last block the requester wants.
    pub to: Digest,
}

/// One block of a catch-up stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResponse {
    /// Encoded block.
    pub block: Vec<u8>,
    /// Encoded consensus chain proving the block; `None` for genesis.
    pub chain: Option<Vec<u8>>,
}

/// Every message the replication protocol exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    PropagateGenesis(PropagateGenesis),
    BlockRequest(BlockRequest),
    BlockResponse(BlockResponse),
}

impl Message {
    /// Short name of the variant, for errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::PropagateGenesis(_) => "PropagateGenesis",
            Message::BlockRequest(_) => "BlockRequest",
            Message::BlockResponse(_) => "BlockResponse",
        }
    }
}

impl From<PropagateGenesis> for Message {
    fn from(msg: PropagateGenesis) -> Self {
        Message::PropagateGenesis(msg)
    }
}

impl From<BlockRequest> for Message {
    fn from(msg: BlockRequest) -> Self {
        Message::BlockRequest(msg)
    }
}

impl From<BlockResponse> for Message {
    fn from(msg: BlockResponse) -> Self {
        Message::BlockResponse(msg)
    }
}
