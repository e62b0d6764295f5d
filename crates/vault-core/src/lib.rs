//! # vault-core
//!
//! Core of the pwvault password manager:
//! - Argon2id key derivation from a single master password
//! - HMAC verifier tokens, so a wrong password is rejected without decrypting
//! - AES-256-GCM encryption of each credential field
//! - Master password rotation committed atomically
//! - Key material zeroized on lock, rotation and drop

pub mod crypto;
pub mod error;
pub mod export;
pub mod generator;
pub mod record;
pub mod rotation;
pub mod session;
pub mod settings;
pub mod storage;
mod vault;

pub use crypto::{DerivedKey, KdfParams, Salt, SecretString, VerifierToken};
pub use error::{Result, VaultError};
pub use record::{
    CredentialInput, CredentialRecord, CredentialSummary, DecryptedCredential, MasterRecord,
};
pub use rotation::{rotate, RotationOutcome};
pub use session::Session;
pub use settings::Settings;
pub use storage::{FileVaultStore, VaultStore};
pub use vault::{AddedCredential, Vault, VaultState};
