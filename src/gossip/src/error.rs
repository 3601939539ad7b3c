//! Gossip error types

use crate::message::MessageId;
use thiserror::Error;
use trustmesh_core::CoreError;

#[derive(Error, Debug)]
pub enum GossipError {
    /// Claimed id does not match the message content
    #[error("Message id mismatch: claimed {claimed}, computed {computed}")]
    IdMismatch { claimed: MessageId, computed: MessageId },

    #[error("Malformed gossip message: {0}")]
    Malformed(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<Box<bincode::ErrorKind>> for GossipError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        GossipError::Malformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GossipError>;
