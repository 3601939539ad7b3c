//! Collaborator seams
//!
//! Identity, persistence and transport are owned by collaborators outside the
//! engine. The engine consumes them through these traits.

pub mod identity;
pub mod persistence;
pub mod transport;

// Re-export commonly used traits
pub use identity::{SignatureVerifier, Signer};
pub use persistence::{EdgeRepository, ScoreRepository};
pub use transport::Transport;
