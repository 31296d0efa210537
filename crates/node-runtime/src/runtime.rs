//! # Collective Runtime
//!
//! Boots an in-process collective and runs the full replication flow:
//!
//! 1. Generate one authority per rotation epoch
//! 2. The leader creates genesis and propagates it to its co-members
//! 3. The leader grows the chain, each block signed by the previous authority
//! 4. A lagging participant catches up from the leader and proves the head
//!
//! The lagging participant keeps its blocks in `data_dir` when one is
//! configured, otherwise in memory.

use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use sc_skipchain::{
    Authority, BlockLog, BlsCollectiveCrypto, CatchUpReport, CollectiveSigner, FileLog, LocalNetwork,
    MemoryLog, SkipBlock, SkipchainService,
};
use shared_types::{Address, Digest};
use tracing::{debug, info};

use crate::config::NodeConfig;

type Node<L> = SkipchainService<L, BlsCollectiveCrypto>;

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Hash of the last block produced.
    pub head: Digest,
    /// Index of the last block produced.
    pub height: u64,
    /// Authorities the chain went through.
    pub authorities: usize,
    /// Members that installed the genesis by propagation.
    pub followers: usize,
    /// Links in the lagging node's proof of the head.
    pub proof_links: usize,
    /// What the lagging node's catch-up did.
    pub caught_up: CatchUpReport,
}

/// The in-process collective.
pub struct NodeRuntime {
    config: NodeConfig,
    crypto: Arc<BlsCollectiveCrypto>,
    network: LocalNetwork,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Self {
        let network = LocalNetwork::new(config.skipchain.stream_buffer);
        Self {
            config,
            crypto: Arc::new(BlsCollectiveCrypto::new()),
            network,
        }
    }

    /// Run the flow once.
    pub async fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;
        info!("===========================================");
        info!("  Skipchain Node Runtime");
        info!(
            "  {} member(s), {} block(s), rotate every {}",
            self.config.nodes, self.config.blocks, self.config.rotate_every
        );
        info!("===========================================");

        let authorities = self.authorities()?;
        let leader_address = member_address(0, 0);

        // Step 1: genesis
        let leader = Node::<MemoryLog>::in_memory(self.config.skipchain.clone(), self.crypto.clone())
            .context("Failed to open leader store")?;
        let genesis = leader
            .create_genesis(authorities[0].roster(), b"genesis".to_vec())
            .context("Failed to create genesis")?;
        self.network
            .register(leader_address.clone(), leader.handler());

        // Step 2: propagation
        let followers = self
            .start_followers(&leader, &authorities[0], &leader_address, &genesis)
            .await?;

        // Step 3: production
        self.produce(&leader, &authorities)?;
        let head = leader.store().last().context("Leader chain is empty")?;

        // Step 4: catch-up
        let lagging = self.lagging_node()?;
        let report = lagging
            .catch_up()
            .catch_up(
                &self.network.endpoint(Address::from("lagging")),
                &leader_address,
                head.hash,
            )
            .await
            .context("Catch-up from leader failed")?;

        let proof = lagging
            .engine()
            .chain_to(&head.hash)
            .context("Lagging node cannot prove the head")?;
        let genesis_hash = lagging.store().genesis().context("Lagging node has no genesis")?.hash;
        lagging
            .engine()
            .verify_to(&proof, &genesis_hash, &head.hash)
            .context("Head proof does not verify")?;
        ensure!(
            lagging.store().len() == leader.store().len(),
            "lagging node holds {} block(s), leader {}",
            lagging.store().len(),
            leader.store().len()
        );

        info!(
            "Head {} at height {} proven by {} link(s)",
            head.hash.short(),
            head.index(),
            proof.len()
        );
        Ok(RunSummary {
            head: head.hash,
            height: head.index(),
            authorities: authorities.len(),
            followers: followers.len(),
            proof_links: proof.len(),
            caught_up: report,
        })
    }

    /// One authority per rotation epoch of the configured chain.
    fn authorities(&self) -> Result<Vec<CollectiveSigner>> {
        let epochs = self.epoch_of(self.config.blocks) + 1;
        (0..epochs)
            .map(|epoch| {
                let addresses = (0..self.config.nodes).map(|i| member_address(epoch, i));
                let signer = match self.config.seed {
                    Some(seed) => CollectiveSigner::from_seed(seed.wrapping_add(epoch as u64), addresses),
                    None => CollectiveSigner::generate(addresses),
                };
                signer.with_context(|| format!("Failed to create authority {}", epoch))
            })
            .collect()
    }

    /// Register the leader's co-members and propagate the genesis to them.
    async fn start_followers(
        &self,
        leader: &Node<MemoryLog>,
        authority: &CollectiveSigner,
        leader_address: &Address,
        genesis: &SkipBlock,
    ) -> Result<Vec<Node<MemoryLog>>> {
        let roster = authority.roster();
        let others = roster.excluding(leader_address);

        let mut followers = Vec::new();
        for member in others.members() {
            let follower = Node::<MemoryLog>::in_memory(self.config.skipchain.clone(), self.crypto.clone())
                .context("Failed to open follower store")?;
            self.network
                .register(member.address.clone(), follower.handler());
            followers.push(follower);
        }

        leader
            .propagator()
            .propagate(&self.network.endpoint(leader_address.clone()), &others, genesis)
            .await
            .context("Genesis propagation failed")?;
        Ok(followers)
    }

    fn produce(&self, leader: &Node<MemoryLog>, authorities: &[CollectiveSigner]) -> Result<()> {
        for index in 1..=self.config.blocks {
            let (signing, next) = (self.epoch_of(index - 1), self.epoch_of(index));
            let block = leader
                .next_block(authorities[next].roster(), format!("block-{}", index).into_bytes())
                .context("Failed to seal block")?;
            let signature = authorities[signing]
                .sign(block.hash.as_bytes())
                .with_context(|| format!("Failed to sign block {}", index))?;
            leader
                .append(block.with_signature(signature))
                .with_context(|| format!("Failed to store block {}", index))?;

            if next != signing {
                info!("🔄 Authority rotated to #{} at block {}", next, index);
            } else {
                debug!("Produced block {}", index);
            }
        }
        Ok(())
    }

    fn lagging_node(&self) -> Result<Node<Box<dyn BlockLog>>> {
        let log: Box<dyn BlockLog> = match &self.config.skipchain.data_dir {
            Some(dir) => Box::new(
                FileLog::in_dir(dir)
                    .with_context(|| format!("Failed to open block log in {}", dir.display()))?,
            ),
            None => Box::new(MemoryLog::new()),
        };
        Node::open(self.config.skipchain.clone(), log, self.crypto.clone())
            .context("Failed to open lagging node")
    }

    fn epoch_of(&self, index: u64) -> usize {
        match self.config.rotate_every {
            0 => 0,
            every => (index / every) as usize,
        }
    }
}

fn member_address(epoch: usize, position: usize) -> Address {
    Address::new(format!("node-{}-{}", epoch, position))
}
