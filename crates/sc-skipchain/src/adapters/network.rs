//! # In-Process Network
//!
//! A transport where every participant lives in the same process. Handlers
//! are registered by address; calls invoke them directly and streams are a
//! pair of bounded tokio channels.
//!
//! The serving task of a stream is cancelled as soon as the requester drops
//! its receiving half. A handler error is forwarded to the requester as
//! `TransportError::Remote`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Address, Message, TransportError};
use tokio::sync::mpsc;
use tracing::debug;

use crate::ports::inbound::MessageHandler;
use crate::ports::outbound::{Network, StreamReceiver, StreamSender};
use crate::replication::cancellation;

type Frame = Result<(Address, Message), TransportError>;

/// Registry of in-process participants.
#[derive(Clone)]
pub struct LocalNetwork {
    handlers: Arc<RwLock<HashMap<Address, Arc<dyn MessageHandler>>>>,
    stream_buffer: usize,
}

impl LocalNetwork {
    /// `stream_buffer` bounds each direction of every stream.
    pub fn new(stream_buffer: usize) -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            stream_buffer: stream_buffer.max(1),
        }
    }

    pub fn register(&self, address: Address, handler: Arc<dyn MessageHandler>) {
        debug!("[sc-network] Registered {}", address);
        self.handlers.write().insert(address, handler);
    }

    /// Remove a participant; later calls to it fail with `Unreachable`.
    pub fn unregister(&self, address: &Address) {
        self.handlers.write().remove(address);
    }

    /// The network as seen by the participant at `local`.
    pub fn endpoint(&self, local: Address) -> LocalEndpoint {
        LocalEndpoint {
            local,
            network: self.clone(),
        }
    }

    fn lookup(&self, address: &Address) -> Result<Arc<dyn MessageHandler>, TransportError> {
        self.handlers
            .read()
            .get(address)
            .cloned()
            .ok_or_else(|| TransportError::Unreachable {
                address: address.clone(),
            })
    }
}

/// One participant's handle on a `LocalNetwork`.
#[derive(Clone)]
pub struct LocalEndpoint {
    local: Address,
    network: LocalNetwork,
}

impl LocalEndpoint {
    pub fn address(&self) -> &Address {
        &self.local
    }
}

#[async_trait]
impl Network for LocalEndpoint {
    async fn call(
        &self,
        to: &Address,
        message: Message,
    ) -> Result<Option<Message>, TransportError> {
        let handler = self.network.lookup(to)?;
        handler
            .process(&self.local, message)
            .await
            .map_err(|e| TransportError::Remote(e.to_string()))
    }

    async fn open_stream(
        &self,
        to: &Address,
    ) -> Result<(Box<dyn StreamSender>, Box<dyn StreamReceiver>), TransportError> {
        let handler = self.network.lookup(to)?;
        let buffer = self.network.stream_buffer;
        let (request_tx, request_rx) = mpsc::channel::<Frame>(buffer);
        let (response_tx, response_rx) = mpsc::channel::<Frame>(buffer);

        let server_out = ChannelSender {
            local: to.clone(),
            peer: self.local.clone(),
            tx: response_tx.clone(),
        };
        let server_in = ChannelReceiver { rx: request_rx };
        let (handle, token) = cancellation();
        let server = to.clone();

        tokio::spawn(async move {
            let stream = handler.stream(Box::new(server_out), Box::new(server_in), token);
            tokio::pin!(stream);
            let finished = tokio::select! {
                outcome = &mut stream => Some(outcome),
                _ = response_tx.closed() => None,
            };
            let outcome = match finished {
                Some(outcome) => outcome,
                None => {
                    debug!("[sc-network] Requester went away; cancelling stream on {}", server);
                    handle.cancel();
                    stream.await
                }
            };
            if let Err(e) = outcome {
                debug!("[sc-network] Stream on {} ended with error: {}", server, e);
                // Fails only if the requester is gone, which needs no report.
                let _ = response_tx.send(Err(TransportError::Remote(e.to_string()))).await;
            }
        });

        let client_out = ChannelSender {
            local: self.local.clone(),
            peer: to.clone(),
            tx: request_tx,
        };
        let client_in = ChannelReceiver { rx: response_rx };
        Ok((Box::new(client_out), Box::new(client_in)))
    }
}

struct ChannelSender {
    local: Address,
    peer: Address,
    tx: mpsc::Sender<Frame>,
}

#[async_trait]
impl StreamSender for ChannelSender {
    async fn send(&self, message: Message, to: &Address) -> Result<(), TransportError> {
        if to != &self.peer {
            return Err(TransportError::Unreachable {
                address: to.clone(),
            });
        }
        self.tx
            .send(Ok((self.local.clone(), message)))
            .await
            .map_err(|_| TransportError::Closed)
    }
}

struct ChannelReceiver {
    rx: mpsc::Receiver<Frame>,
}

#[async_trait]
impl StreamReceiver for ChannelReceiver {
    async fn recv(&mut self) -> Result<(Address, Message), TransportError> {
        match self.rx.recv().await {
            Some(frame) => frame,
            None => Err(TransportError::Closed),
        }
    }
}
