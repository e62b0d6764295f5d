//! Cryptographic primitives for the vault
//!
//! This module provides:
//! - Argon2id key derivation from the master password
//! - HMAC-SHA256 password verifier tokens
//! - AES-256-GCM authenticated encryption of record fields
//! - Secure memory handling with zeroize

mod encryption;
mod key_derivation;
mod secure_memory;
pub mod verifier;

pub use encryption::{decrypt, decrypt_string, encrypt, encrypt_string, EncryptedData};
pub use key_derivation::{derive_key, derive_key_blocking, KdfParams, Salt, SALT_LEN};
pub use secure_memory::{DerivedKey, SecretString, KEY_LEN};
pub use verifier::VerifierToken;
