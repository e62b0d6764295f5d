//! AES-256-GCM authenticated encryption of individual record fields
//!
//! Encryption format: `{nonce_hex}:{auth_tag_hex}:{ciphertext_hex}`
//! - Nonce: 12 bytes (96 bits), fresh per call, stored first
//! - Auth tag: 16 bytes (128 bits)
//! - Ciphertext: variable length
//!
//! Every decryption failure maps to [`VaultError::DecryptionFailed`], whether
//! the field was malformed, tampered with, or sealed under another key.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};

use super::secure_memory::{DerivedKey, SecretString};
use crate::error::{Result, VaultError};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encrypted field with nonce and auth tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_LEN],
    pub auth_tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl std::fmt::Display for EncryptedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(self.nonce),
            hex::encode(self.auth_tag),
            hex::encode(&self.ciphertext)
        )
    }
}

impl std::str::FromStr for EncryptedData {
    type Err = VaultError;

    /// Parse from the format: `{nonce_hex}:{auth_tag_hex}:{ciphertext_hex}`
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let (Some(nonce), Some(tag), Some(ciphertext), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VaultError::DecryptionFailed);
        };

        let nonce: [u8; NONCE_LEN] = decode_fixed(nonce)?;
        let auth_tag: [u8; TAG_LEN] = decode_fixed(tag)?;
        let ciphertext = hex::decode(ciphertext).map_err(|_| VaultError::DecryptionFailed)?;

        Ok(Self {
            nonce,
            auth_tag,
            ciphertext,
        })
    }
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    hex::decode(s)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(VaultError::DecryptionFailed)
}

fn cipher_for(key: &DerivedKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

/// Encrypt plaintext using AES-256-GCM under a fresh random nonce
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> Result<EncryptedData> {
    let cipher = cipher_for(key);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    // aes-gcm appends the auth tag to the ciphertext
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| VaultError::EncryptionFailed)?;

    if sealed.len() < TAG_LEN {
        return Err(VaultError::EncryptionFailed);
    }

    let tag_start = sealed.len() - TAG_LEN;
    let mut auth_tag = [0u8; TAG_LEN];
    auth_tag.copy_from_slice(&sealed[tag_start..]);
    sealed.truncate(tag_start);

    Ok(EncryptedData {
        nonce,
        auth_tag,
        ciphertext: sealed,
    })
}

/// Encrypt a string and return the serialized format
pub fn encrypt_string(plaintext: &str, key: &DerivedKey) -> Result<String> {
    Ok(encrypt(plaintext.as_bytes(), key)?.to_string())
}

/// Decrypt and authenticate a field. Fails closed on any mismatch.
pub fn decrypt(encrypted: &EncryptedData, key: &DerivedKey) -> Result<Vec<u8>> {
    let cipher = cipher_for(key);

    let mut sealed = Vec::with_capacity(encrypted.ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(&encrypted.ciphertext);
    sealed.extend_from_slice(&encrypted.auth_tag);

    cipher
        .decrypt(Nonce::from_slice(&encrypted.nonce), sealed.as_slice())
        .map_err(|_| VaultError::DecryptionFailed)
}

/// Decrypt from serialized format into a zeroizing string
pub fn decrypt_string(encrypted: &str, key: &DerivedKey) -> Result<SecretString> {
    let encrypted: EncryptedData = encrypted.parse()?;
    let plaintext = decrypt(&encrypted, key)?;
    String::from_utf8(plaintext)
        .map(SecretString::new)
        .map_err(|_| VaultError::DecryptionFailed)
}
