//! Password verifier tokens
//!
//! The token is HMAC-SHA256 of a fixed label, keyed with the derived key. It is
//! a one-way function of the key, so storing it never exposes the key, and a
//! password attempt is checked with a single derivation instead of trying to
//! decrypt stored records.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::secure_memory::DerivedKey;
use crate::error::{Result, VaultError};

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation label for the verifier MAC
const VERIFIER_LABEL: &[u8] = b"pwvault/master-verifier/v1";

/// Token length in bytes
pub const TOKEN_LEN: usize = 32;

/// Stored password verifier
#[derive(Clone, PartialEq, Eq)]
pub struct VerifierToken([u8; TOKEN_LEN]);

impl VerifierToken {
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| VaultError::StoreError(format!("Invalid verifier hex: {}", e)))?;
        let bytes: [u8; TOKEN_LEN] = bytes.as_slice().try_into().map_err(|_| {
            VaultError::StoreError(format!(
                "Invalid verifier length: expected {}, got {}",
                TOKEN_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for VerifierToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifierToken({})", self.to_hex())
    }
}

fn mac_for(key: &DerivedKey) -> HmacSha256 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(VERIFIER_LABEL);
    mac
}

/// Compute the verifier token for a derived key
pub fn create(key: &DerivedKey) -> VerifierToken {
    let tag = mac_for(key).finalize().into_bytes();
    let mut bytes = [0u8; TOKEN_LEN];
    bytes.copy_from_slice(&tag);
    VerifierToken(bytes)
}

/// Check a derived key against a stored token in constant time
pub fn check(key: &DerivedKey, token: &VerifierToken) -> bool {
    mac_for(key).verify_slice(token.as_bytes()).is_ok()
}
