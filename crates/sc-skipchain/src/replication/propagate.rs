use std::sync::Arc;

use shared_types::{Address, PropagateGenesis};
use tracing::{info, warn};

use crate::codec::BlockCodec;
use crate::domain::{Authority, ReplicationError, SkipBlock};
use crate::ports::outbound::{CollectiveCrypto, Network};

/// Sends a genesis block to every member of a roster.
pub struct GenesisPropagator<C: CollectiveCrypto> {
    codec: Arc<BlockCodec<C>>,
}

impl<C: CollectiveCrypto> GenesisPropagator<C> {
    pub fn new(codec: Arc<BlockCodec<C>>) -> Self {
        Self { codec }
    }

    /// Call `PropagateGenesis` on each member once.
    ///
    /// Every member is attempted; failures are collected, not retried.
    pub async fn propagate(
        &self,
        network: &dyn Network,
        roster: &dyn Authority,
        genesis: &SkipBlock,
    ) -> Result<(), ReplicationError> {
        let encoded = self.codec.encode_block(genesis)?;
        let targets: Vec<Address> = roster.members().iter().map(|m| m.address.clone()).collect();

        let mut failures = Vec::new();
        for address in &targets {
            let message = PropagateGenesis {
                genesis: encoded.clone(),
            };
            if let Err(e) = network.call(address, message.into()).await {
                warn!(
                    "[sc-replication] Genesis propagation to {} failed: {}",
                    address, e
                );
                failures.push((address.clone(), e.to_string()));
            }
        }

        if !failures.is_empty() {
            return Err(ReplicationError::Propagation { failures });
        }
        info!(
            "[sc-replication] 📣 Genesis {} propagated to {} member(s)",
            genesis.hash.short(),
            targets.len()
        );
        Ok(())
    }
}
