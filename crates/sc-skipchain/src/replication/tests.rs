use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared_types::{
    Address, BlockRequest, BlockResponse, Digest, Message, PropagateGenesis, TransportError,
};
use tokio::sync::mpsc;

use super::*;
use crate::adapters::crypto::BlsCollectiveCrypto;
use crate::adapters::log::MemoryLog;
use crate::adapters::network::LocalNetwork;
use crate::config::SkipchainConfig;
use crate::domain::{Chain, ChainError, Link, Member, ReplicationError, Roster, SkipBlock};
use crate::ports::inbound::MessageHandler;
use crate::ports::outbound::{Network, StreamReceiver, StreamSender};
use crate::service::SkipchainService;
use crate::test_utils::{test_signer, TestChain};

type Node = SkipchainService<MemoryLog, BlsCollectiveCrypto>;

fn server() -> Address {
    Address::from("server")
}

fn client() -> Address {
    Address::from("client")
}

fn node(chain: &TestChain, count: usize) -> Node {
    chain.service_with(SkipchainConfig::for_testing(), count)
}

/// Network with `serving` registered at `server()`.
fn network_with(serving: &Node) -> LocalNetwork {
    let network = LocalNetwork::new(1);
    network.register(server(), serving.handler());
    network
}

fn foreign_genesis(chain: &TestChain) -> SkipBlock {
    SkipBlock::genesis(chain.crypto.as_ref(), test_signer(7).roster(), b"elsewhere".to_vec())
}

fn propagate_message(node: &Node, block: &SkipBlock) -> Message {
    PropagateGenesis {
        genesis: node.codec().encode_block(block).unwrap(),
    }
    .into()
}

// --- PropagateGenesis ---

#[tokio::test]
async fn test_genesis_install_is_idempotent() {
    let chain = TestChain::build(1, 0);
    let follower = node(&chain, 0);
    let handler = follower.handler();
    let message = propagate_message(&follower, &chain.blocks[0]);

    assert_eq!(handler.process(&client(), message.clone()).await, Ok(None));
    assert_eq!(handler.process(&client(), message).await, Ok(None));
    assert_eq!(follower.store().len(), 1);
    assert_eq!(follower.store().genesis().unwrap().hash, chain.hash(0));
}

#[tokio::test]
async fn test_conflicting_genesis_rejected() {
    let chain = TestChain::build(1, 0);
    let follower = node(&chain, 1);
    let message = propagate_message(&follower, &foreign_genesis(&chain));

    let result = follower.handler().process(&client(), message).await;
    assert!(matches!(result, Err(ReplicationError::Conflict { index: 0, .. })));
    assert_eq!(follower.store().genesis().unwrap().hash, chain.hash(0));
}

#[tokio::test]
async fn test_non_genesis_rejected() {
    let chain = TestChain::build(2, 0);
    let follower = node(&chain, 0);
    let message = propagate_message(&follower, &chain.blocks[1]);

    let result = follower.handler().process(&client(), message).await;
    assert!(matches!(result, Err(ReplicationError::Protocol(_))));
    assert!(follower.store().is_empty());
}

#[tokio::test]
async fn test_tampered_genesis_rejected() {
    let chain = TestChain::build(1, 0);
    let follower = node(&chain, 0);
    let mut bytes = follower.codec().encode_block(&chain.blocks[0]).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let result = follower
        .handler()
        .process(&client(), PropagateGenesis { genesis: bytes }.into())
        .await;
    assert!(matches!(result, Err(ReplicationError::Decode(_))));
}

#[tokio::test]
async fn test_block_request_is_not_a_call() {
    let chain = TestChain::build(1, 0);
    let serving = node(&chain, 1);
    let message = BlockRequest { to: chain.hash(0) }.into();

    let result = serving.handler().process(&client(), message).await;
    assert!(matches!(result, Err(ReplicationError::Protocol(_))));
}

// --- BlockRequest stream ---

#[tokio::test]
async fn test_stream_serves_blocks_with_chains() {
    let chain = TestChain::build(6, 2);
    let serving = node(&chain, 6);
    let network = network_with(&serving);
    let endpoint = network.endpoint(client());

    let (sender, mut receiver) = endpoint.open_stream(&server()).await.unwrap();
    sender
        .send(BlockRequest { to: chain.hash(5) }.into(), &server())
        .await
        .unwrap();

    for index in 0..6 {
        let (from, message) = receiver.recv().await.unwrap();
        assert_eq!(from, server());
        let response = match message {
            Message::BlockResponse(response) => response,
            other => panic!("unexpected {}", other.kind()),
        };
        let block = serving.codec().decode_block(&response.block).unwrap();
        assert_eq!(block.hash, chain.hash(index));

        match response.chain {
            None => assert_eq!(index, 0),
            Some(bytes) => {
                let proof = serving.codec().decode_chain(&bytes).unwrap();
                assert_eq!(proof.target(), Some(&block.hash));
                assert_eq!(
                    serving.engine().verify(&proof, &chain.hash(0)),
                    Ok(block.hash)
                );
            }
        }
    }
    assert_eq!(receiver.recv().await, Err(TransportError::Closed));
}

#[tokio::test]
async fn test_stream_to_genesis_sends_one_block() {
    let chain = TestChain::build(3, 0);
    let serving = node(&chain, 3);
    let network = network_with(&serving);
    let endpoint = network.endpoint(client());

    let (sender, mut receiver) = endpoint.open_stream(&server()).await.unwrap();
    sender
        .send(BlockRequest { to: chain.hash(0) }.into(), &server())
        .await
        .unwrap();
    assert!(receiver.recv().await.is_ok());
    assert_eq!(receiver.recv().await, Err(TransportError::Closed));
}

#[tokio::test]
async fn test_stream_unknown_target_fails_after_horizon() {
    let chain = TestChain::build(6, 2);
    let serving = node(&chain, 6);
    let network = network_with(&serving);
    let endpoint = network.endpoint(client());

    let (sender, mut receiver) = endpoint.open_stream(&server()).await.unwrap();
    sender
        .send(BlockRequest { to: Digest::new([4; 32]) }.into(), &server())
        .await
        .unwrap();

    let mut responses = 0;
    let failure = loop {
        match receiver.recv().await {
            Ok(_) => responses += 1,
            Err(e) => break e,
        }
    };
    assert_eq!(responses, 6);
    assert!(matches!(failure, TransportError::Remote(_)));
}

#[tokio::test]
async fn test_stream_rejects_wrong_first_message() {
    let chain = TestChain::build(2, 0);
    let serving = node(&chain, 2);
    let network = network_with(&serving);
    let endpoint = network.endpoint(client());

    let (sender, mut receiver) = endpoint.open_stream(&server()).await.unwrap();
    sender
        .send(propagate_message(&serving, &chain.blocks[0]), &server())
        .await
        .unwrap();
    assert!(matches!(receiver.recv().await, Err(TransportError::Remote(_))));
}

#[tokio::test]
async fn test_stream_send_to_wrong_peer() {
    let chain = TestChain::build(1, 0);
    let serving = node(&chain, 1);
    let network = network_with(&serving);
    let endpoint = network.endpoint(client());

    let (sender, _receiver) = endpoint.open_stream(&server()).await.unwrap();
    let stranger = Address::from("stranger");
    assert_eq!(
        sender
            .send(BlockRequest { to: chain.hash(0) }.into(), &stranger)
            .await,
        Err(TransportError::Unreachable { address: stranger })
    );
}

/// Forwards to a handler and reports how each stream ended.
struct Observed {
    inner: Arc<dyn MessageHandler>,
    outcomes: mpsc::UnboundedSender<Result<(), ReplicationError>>,
}

#[async_trait]
impl MessageHandler for Observed {
    async fn process(
        &self,
        from: &Address,
        message: Message,
    ) -> Result<Option<Message>, ReplicationError> {
        self.inner.process(from, message).await
    }

    async fn stream(
        &self,
        out: Box<dyn StreamSender>,
        input: Box<dyn StreamReceiver>,
        cancellation: Cancellation,
    ) -> Result<(), ReplicationError> {
        let outcome = self.inner.stream(out, input, cancellation).await;
        let _ = self.outcomes.send(outcome.clone());
        outcome
    }
}

#[tokio::test]
async fn test_dropped_requester_cancels_stream() {
    let chain = TestChain::build(2, 0);
    let serving = node(&chain, 2);
    let (tx, mut outcomes) = mpsc::unbounded_channel();
    let network = LocalNetwork::new(1);
    network.register(
        server(),
        Arc::new(Observed {
            inner: serving.handler(),
            outcomes: tx,
        }),
    );
    let endpoint = network.endpoint(client());

    let (sender, receiver) = endpoint.open_stream(&server()).await.unwrap();
    // The server now waits for a request that never comes.
    drop(receiver);

    let outcome = tokio::time::timeout(Duration::from_secs(5), outcomes.recv())
        .await
        .unwrap();
    assert_eq!(outcome, Some(Err(ReplicationError::Cancelled)));
    drop(sender);
}

#[tokio::test]
async fn test_cancelled_token_stops_stream() {
    let chain = TestChain::build(2, 0);
    let serving = node(&chain, 2);
    let (handle, token) = cancellation();
    handle.cancel();

    let (out, _sink) = stream_pair();
    let (_source, input) = stream_pair();
    let result = serving.handler().stream(out, input, token).await;
    assert_eq!(result, Err(ReplicationError::Cancelled));
}

/// A bare channel stream for driving a handler without a network.
fn stream_pair() -> (Box<dyn StreamSender>, Box<dyn StreamReceiver>) {
    struct Tx(mpsc::Sender<(Address, Message)>);
    struct Rx(mpsc::Receiver<(Address, Message)>);

    #[async_trait]
    impl StreamSender for Tx {
        async fn send(&self, message: Message, _to: &Address) -> Result<(), TransportError> {
            self.0
                .send((client(), message))
                .await
                .map_err(|_| TransportError::Closed)
        }
    }

    #[async_trait]
    impl StreamReceiver for Rx {
        async fn recv(&mut self) -> Result<(Address, Message), TransportError> {
            self.0.recv().await.ok_or(TransportError::Closed)
        }
    }

    let (tx, rx) = mpsc::channel(4);
    (Box::new(Tx(tx)), Box::new(Rx(rx)))
}

// --- Catch-up ---

#[tokio::test]
async fn test_catch_up_from_empty() {
    let chain = TestChain::build(8, 3);
    let serving = node(&chain, 8);
    let network = network_with(&serving);
    let lagging = node(&chain, 0);

    let report = lagging
        .catch_up()
        .catch_up(&network.endpoint(client()), &server(), chain.hash(7))
        .await
        .unwrap();

    assert_eq!(
        report,
        CatchUpReport {
            target: chain.hash(7),
            received: 8,
            inserted: 8,
            skipped: 0,
        }
    );
    assert_eq!(lagging.store().len(), 8);
    for index in 0..8 {
        assert_eq!(lagging.store().read(index as u64).unwrap().hash, chain.hash(index));
    }
}

#[tokio::test]
async fn test_catch_up_resumes() {
    let chain = TestChain::build(8, 3);
    let serving = node(&chain, 8);
    let network = network_with(&serving);
    let lagging = node(&chain, 4);

    let report = lagging
        .catch_up()
        .catch_up(&network.endpoint(client()), &server(), chain.hash(7))
        .await
        .unwrap();
    assert_eq!(report.received, 8);
    assert_eq!(report.skipped, 4);
    assert_eq!(report.inserted, 4);
    assert_eq!(lagging.store().last().unwrap().hash, chain.hash(7));
}

#[tokio::test]
async fn test_catch_up_to_intermediate_block() {
    let chain = TestChain::build(8, 3);
    let serving = node(&chain, 8);
    let network = network_with(&serving);
    let lagging = node(&chain, 1);

    let report = lagging
        .catch_up()
        .catch_up(&network.endpoint(client()), &server(), chain.hash(4))
        .await
        .unwrap();
    assert_eq!(report.inserted, 4);
    assert_eq!(lagging.store().len(), 5);
}

#[tokio::test]
async fn test_catch_up_conflicting_genesis() {
    let chain = TestChain::build(3, 0);
    let serving = node(&chain, 3);
    let network = network_with(&serving);
    let lagging = node(&chain, 0);
    lagging.append(foreign_genesis(&chain)).unwrap();

    let result = lagging
        .catch_up()
        .catch_up(&network.endpoint(client()), &server(), chain.hash(2))
        .await;
    assert!(matches!(result, Err(ReplicationError::Conflict { index: 0, .. })));
    assert_eq!(lagging.store().len(), 1);
}

#[tokio::test]
async fn test_catch_up_unknown_target_is_incomplete() {
    let chain = TestChain::build(4, 2);
    let serving = node(&chain, 4);
    let network = network_with(&serving);
    let lagging = node(&chain, 0);
    let target = Digest::new([6; 32]);

    let result = lagging
        .catch_up()
        .catch_up(&network.endpoint(client()), &server(), target)
        .await;
    match result {
        Err(ReplicationError::Incomplete {
            target: t,
            received,
            cause: TransportError::Remote(_),
        }) => {
            assert_eq!(t, target);
            assert_eq!(received, 4);
        }
        other => panic!("unexpected {:?}", other),
    }
    // Verified blocks stay stored.
    assert_eq!(lagging.store().len(), 4);
}

#[tokio::test]
async fn test_catch_up_rejects_forged_block() {
    let chain = TestChain::build(3, 0);
    let mut blocks = chain.blocks.clone();
    let forged = test_signer(9).sign(blocks[2].hash.as_bytes()).unwrap();
    blocks[2].signature = Some(forged);
    let serving = SkipchainService::open(
        SkipchainConfig::for_testing(),
        MemoryLog::with_blocks(blocks),
        chain.crypto.clone(),
    )
    .unwrap();
    let network = network_with(&serving);
    let lagging = node(&chain, 0);

    let result = lagging
        .catch_up()
        .catch_up(&network.endpoint(client()), &server(), chain.hash(2))
        .await;
    assert!(matches!(
        result,
        Err(ReplicationError::Chain(ChainError::InvalidProof { position: 0, .. }))
    ));
    assert_eq!(lagging.store().len(), 2);
}

/// Serves a fixed list of responses to the first request.
struct Canned(Vec<BlockResponse>);

#[async_trait]
impl MessageHandler for Canned {
    async fn process(
        &self,
        _from: &Address,
        message: Message,
    ) -> Result<Option<Message>, ReplicationError> {
        Err(ReplicationError::Protocol(format!("unexpected {}", message.kind())))
    }

    async fn stream(
        &self,
        out: Box<dyn StreamSender>,
        mut input: Box<dyn StreamReceiver>,
        _cancellation: Cancellation,
    ) -> Result<(), ReplicationError> {
        let (peer, _) = input.recv().await?;
        for response in &self.0 {
            out.send(Message::BlockResponse(response.clone()), &peer).await?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_catch_up_rejects_block_signed_by_rotated_out_authority() {
    // Blocks 0-1 carry A0, 2-3 carry A1, 4-5 carry A2.
    let chain = TestChain::build(6, 2);
    let lagging = node(&chain, 5);

    // Block 5 extends the real block 4 but is signed by the genesis roster,
    // behind a single link straight from genesis.
    let stale = &chain.signers[0];
    let unsigned = SkipBlock::seal(
        chain.crypto.as_ref(),
        5,
        chain.hash(4),
        chain.signer_at(4).roster(),
        b"stale".to_vec(),
    );
    let signature = stale.sign(unsigned.hash.as_bytes()).unwrap();
    let block = unsigned.with_signature(signature.clone());
    let proof = Chain::new(vec![Link {
        from: chain.hash(0),
        to: block.hash,
        header: block.header.clone(),
        authority: stale.roster(),
        signature,
    }]);
    // On its own the proof checks out from genesis.
    lagging
        .engine()
        .verify_to(&proof, &chain.hash(0), &block.hash)
        .unwrap();

    let response = lagging.codec().pack_response(&block, Some(&proof)).unwrap();
    let network = LocalNetwork::new(1);
    network.register(server(), Arc::new(Canned(vec![response])));

    let result = lagging
        .catch_up()
        .catch_up(&network.endpoint(client()), &server(), block.hash)
        .await;
    assert!(matches!(
        result,
        Err(ReplicationError::Chain(ChainError::InvalidProof { position: 0, .. }))
    ));
    assert_eq!(lagging.store().len(), 5);
    assert!(lagging.store().read_by_hash(&block.hash).is_err());
}

#[tokio::test]
async fn test_catch_up_unreachable_peer() {
    let chain = TestChain::build(1, 0);
    let lagging = node(&chain, 0);
    let network = LocalNetwork::new(1);

    let result = lagging
        .catch_up()
        .catch_up(&network.endpoint(client()), &server(), chain.hash(0))
        .await;
    assert_eq!(
        result,
        Err(ReplicationError::Transport(TransportError::Unreachable {
            address: server()
        }))
    );
}

// --- Genesis propagation ---

#[tokio::test]
async fn test_propagate_reaches_every_member() {
    let chain = TestChain::build(1, 0);
    let leader = node(&chain, 1);
    let followers: Vec<Node> = (0..3).map(|_| node(&chain, 0)).collect();
    let network = LocalNetwork::new(1);
    let mut members = vec![Member::new("leader", vec![])];
    for (i, follower) in followers.iter().enumerate() {
        let address = Address::new(format!("follower-{}", i));
        network.register(address.clone(), follower.handler());
        members.push(Member::new(address, vec![]));
    }
    let roster = Roster::new(members);

    leader
        .propagator()
        .propagate(
            &network.endpoint(Address::from("leader")),
            &roster.excluding(&Address::from("leader")),
            &chain.blocks[0],
        )
        .await
        .unwrap();

    for follower in &followers {
        assert_eq!(follower.store().genesis().unwrap().hash, chain.hash(0));
    }
}

#[tokio::test]
async fn test_propagate_reports_failures() {
    let chain = TestChain::build(1, 0);
    let leader = node(&chain, 1);
    let reachable = node(&chain, 0);
    let conflicting = node(&chain, 0);
    conflicting.append(foreign_genesis(&chain)).unwrap();

    let network = LocalNetwork::new(1);
    network.register(Address::from("ok"), reachable.handler());
    network.register(Address::from("conflict"), conflicting.handler());
    let roster = Roster::new(vec![
        Member::new("ok", vec![]),
        Member::new("missing", vec![]),
        Member::new("conflict", vec![]),
    ]);

    let result = leader
        .propagator()
        .propagate(&network.endpoint(Address::from("leader")), &roster, &chain.blocks[0])
        .await;
    let failures = match result {
        Err(ReplicationError::Propagation { failures }) => failures,
        other => panic!("unexpected {:?}", other),
    };
    let failed: Vec<&str> = failures.iter().map(|(a, _)| a.as_str()).collect();
    assert_eq!(failed, vec!["missing", "conflict"]);
    // Reachable members still got the block.
    assert_eq!(reachable.store().genesis().unwrap().hash, chain.hash(0));
}
