//! In-process transport
//!
//! A [`ChannelNetwork`] is a hub of unbounded tokio channels, one inbox per
//! joined node. It carries gossip between engines in one process, for tests
//! and local simulations.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use trustmesh_core::traits::Transport;
use trustmesh_core::{CoreError, NodeId, Result};

type Envelope = (NodeId, Vec<u8>);

#[derive(Default)]
pub struct ChannelNetwork {
    inboxes: RwLock<HashMap<NodeId, mpsc::UnboundedSender<Envelope>>>,
}

impl ChannelNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach `node`, replacing any earlier attachment
    pub fn join(self: &Arc<Self>, node: NodeId) -> ChannelTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes.write().insert(node, tx);
        ChannelTransport {
            local: node,
            network: Arc::clone(self),
            inbox: Mutex::new(rx),
        }
    }

    /// Detach `node`; messages to it fail from now on
    pub fn leave(&self, node: NodeId) {
        self.inboxes.write().remove(&node);
    }

    pub fn len(&self) -> usize {
        self.inboxes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.read().is_empty()
    }

    fn deliver(&self, from: NodeId, to: NodeId, message: &[u8]) -> Result<()> {
        let inboxes = self.inboxes.read();
        let inbox = inboxes
            .get(&to)
            .ok_or_else(|| CoreError::transport(format!("{} is not attached", to)))?;
        inbox
            .send((from, message.to_vec()))
            .map_err(|_| CoreError::transport(format!("{} stopped receiving", to)))
    }
}

pub struct ChannelTransport {
    local: NodeId,
    network: Arc<ChannelNetwork>,
    inbox: Mutex<mpsc::UnboundedReceiver<Envelope>>,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, peer: NodeId, message: &[u8]) -> Result<()> {
        self.network.deliver(self.local, peer, message)
    }

    async fn receive(&self) -> Result<(NodeId, Vec<u8>)> {
        self.inbox
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| CoreError::transport("network closed"))
    }

    fn local_node(&self) -> NodeId {
        self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delivery_between_nodes() {
        let network = ChannelNetwork::new();
        let a = network.join(NodeId(0));
        let b = network.join(NodeId(1));

        a.send(NodeId(1), b"hello").await.unwrap();
        let (from, bytes) = b.receive().await.unwrap();
        assert_eq!(from, NodeId(0));
        assert_eq!(bytes, b"hello".to_vec());
        assert_eq!(network.len(), 2);
    }

    #[tokio::test]
    async fn test_send_to_unknown_peer_fails() {
        let network = ChannelNetwork::new();
        let a = network.join(NodeId(0));
        assert!(a.send(NodeId(5), b"x").await.is_err());

        let b = network.join(NodeId(1));
        network.leave(NodeId(1));
        assert!(a.send(NodeId(1), b"x").await.is_err());
        drop(b);
    }
}
