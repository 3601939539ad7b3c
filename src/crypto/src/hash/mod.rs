pub mod blake3;
pub mod sha3;

pub use self::blake3::Blake3Hash;
pub use self::sha3::Sha3Hash256;
