pub mod did;
pub mod generation;
pub mod storage;

pub use did::Did;
pub use generation::NodeKeypair;
pub use storage::{load_keypair, save_keypair};
