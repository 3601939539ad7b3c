//! Proof-of-Path verification verdicts

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PopVerdict {
    Valid,
    /// Path does not connect the claimed sender and receiver, or the bundle
    /// signature does not belong to the sender
    InvalidEndpoints,
    /// Hop is missing from the graph or its signature does not verify
    BrokenLink { hop: usize },
    /// Hop was explicitly revoked or superseded
    Revoked { hop: usize },
    /// Proof was already accepted once
    Replay,
    /// Proof or one of its edges is past its lifetime
    Expired,
}

impl PopVerdict {
    /// Stable wire code
    pub fn code(&self) -> u8 {
        match self {
            PopVerdict::Valid => 0,
            PopVerdict::InvalidEndpoints => 1,
            PopVerdict::BrokenLink { .. } => 2,
            PopVerdict::Revoked { .. } => 3,
            PopVerdict::Replay => 4,
            PopVerdict::Expired => 5,
        }
    }

    /// Decode a code. Hop-carrying variants take the supplied hop.
    pub fn from_code(code: u8, hop: usize) -> Result<Self> {
        match code {
            0 => Ok(PopVerdict::Valid),
            1 => Ok(PopVerdict::InvalidEndpoints),
            2 => Ok(PopVerdict::BrokenLink { hop }),
            3 => Ok(PopVerdict::Revoked { hop }),
            4 => Ok(PopVerdict::Replay),
            5 => Ok(PopVerdict::Expired),
            other => Err(CoreError::UnknownCode(other)),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, PopVerdict::Valid)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PopVerdict::Valid => "valid",
            PopVerdict::InvalidEndpoints => "invalid_endpoints",
            PopVerdict::BrokenLink { .. } => "broken_link",
            PopVerdict::Revoked { .. } => "revoked",
            PopVerdict::Replay => "replay",
            PopVerdict::Expired => "expired",
        }
    }
}

impl fmt::Display for PopVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopVerdict::BrokenLink { hop } | PopVerdict::Revoked { hop } => {
                write!(f, "{} (hop {})", self.label(), hop)
            }
            _ => f.write_str(self.label()),
        }
    }
}
