//! Unified error types for TrustMesh core
//!
//! Subsystem crates define their own error enums; this one covers the shared
//! data model and the collaborator traits.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type
#[derive(Debug, Error)]
pub enum CoreError {
    /// Risk outside [-1.0, 1.0] or not finite
    #[error("Invalid risk: {0} (must be within -1.0..=1.0)")]
    InvalidRisk(f64),

    /// Edge expires before it was issued
    #[error("Invalid expiry: expires_at {expires_at} precedes timestamp {timestamp}")]
    InvalidExpiry { timestamp: u64, expires_at: u64 },

    /// Trust level without a defined risk mapping
    #[error("Unknown trust level: {0}")]
    UnknownTrustLevel(i8),

    /// Level disagrees with the grade its risk maps to
    #[error("Trust level {level} does not match risk {risk}")]
    LevelMismatch { level: i8, risk: f64 },

    /// Self-referencing edge
    #[error("Self edge on node {0}")]
    SelfEdge(u32),

    /// Unknown verdict or reason code on the wire
    #[error("Unknown code: {0}")]
    UnknownCode(u8),

    /// Identity collaborator failures
    #[error("Identity error: {0}")]
    Identity(String),

    /// Persistence collaborator failures
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Transport collaborator failures
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl CoreError {
    /// Create an identity error
    pub fn identity<S: Into<String>>(msg: S) -> Self {
        CoreError::Identity(msg.into())
    }

    /// Create a persistence error
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        CoreError::Persistence(msg.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        CoreError::Transport(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        CoreError::NotFound(msg.into())
    }
}

impl From<Box<bincode::ErrorKind>> for CoreError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        CoreError::Serialization(format!("Bincode error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let err = CoreError::persistence("disk full");
        assert!(matches!(err, CoreError::Persistence(_)));

        let err = CoreError::transport("peer gone");
        assert!(matches!(err, CoreError::Transport(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidRisk(1.5);
        assert_eq!(err.to_string(), "Invalid risk: 1.5 (must be within -1.0..=1.0)");

        let err = CoreError::UnknownTrustLevel(5);
        assert_eq!(err.to_string(), "Unknown trust level: 5");
    }
}
