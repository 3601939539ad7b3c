//! Transport layer trait

use crate::error::Result;
use crate::types::NodeId;
use async_trait::async_trait;

/// Byte transport between participants
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message to a peer
    async fn send(&self, peer: NodeId, message: &[u8]) -> Result<()>;

    /// Receive a message from any peer
    async fn receive(&self) -> Result<(NodeId, Vec<u8>)>;

    /// Send the same message to several peers, stopping at the first failure
    async fn send_all(&self, peers: &[NodeId], message: &[u8]) -> Result<()> {
        for peer in peers {
            self.send(*peer, message).await?;
        }
        Ok(())
    }

    /// Local participant
    fn local_node(&self) -> NodeId;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use tokio::sync::Mutex;

    // Mock implementation for testing
    struct MockTransport {
        local: NodeId,
        sent: Mutex<Vec<(NodeId, Vec<u8>)>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, peer: NodeId, message: &[u8]) -> Result<()> {
            if peer == self.local {
                return Err(CoreError::transport("loopback"));
            }
            self.sent.lock().await.push((peer, message.to_vec()));
            Ok(())
        }

        async fn receive(&self) -> Result<(NodeId, Vec<u8>)> {
            self.sent
                .lock()
                .await
                .pop()
                .ok_or_else(|| CoreError::transport("empty"))
        }

        fn local_node(&self) -> NodeId {
            self.local
        }
    }

    #[tokio::test]
    async fn test_mock_send_all() {
        let transport = MockTransport {
            local: NodeId(0),
            sent: Mutex::new(Vec::new()),
        };
        transport
            .send_all(&[NodeId(1), NodeId(2)], &[1, 2, 3])
            .await
            .unwrap();
        assert_eq!(transport.sent.lock().await.len(), 2);

        let (peer, bytes) = transport.receive().await.unwrap();
        assert_eq!(peer, NodeId(2));
        assert_eq!(bytes, vec![1, 2, 3]);

        assert!(transport.send_all(&[NodeId(0)], &[9]).await.is_err());
    }
}
