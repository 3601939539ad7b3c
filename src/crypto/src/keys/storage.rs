//! Key files
//!
//! A key file holds the hex-encoded 32-byte seed on one line; the matching
//! `.pub` file holds the hex-encoded DID.

use crate::error::{CryptoError, Result};
use crate::keys::generation::NodeKeypair;
use std::fs;
use std::path::{Path, PathBuf};
use trustmesh_core::NodeId;

pub const SECRET_KEY_FILE: &str = "node.key";
pub const PUBLIC_KEY_FILE: &str = "node.pub";

/// Write `node.key` and `node.pub` into `dir`, returning the secret key path
pub fn save_keypair(keypair: &NodeKeypair, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let secret_path = dir.join(SECRET_KEY_FILE);
    fs::write(&secret_path, format!("{}\n", hex::encode(keypair.seed())))?;
    fs::write(
        dir.join(PUBLIC_KEY_FILE),
        format!("{}\n", keypair.did().to_hex()),
    )?;
    Ok(secret_path)
}

/// Read a seed file written by [`save_keypair`]
pub fn load_keypair(path: &Path, node: NodeId) -> Result<NodeKeypair> {
    let contents = fs::read_to_string(path)?;
    let seed = hex::decode(contents.trim()).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    NodeKeypair::try_from((seed.as_slice(), node))
}
