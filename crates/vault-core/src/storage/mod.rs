//! Storage backends for vault persistence

mod file;
mod traits;

pub use file::FileVaultStore;
pub use traits::VaultStore;
