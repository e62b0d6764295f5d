//! Password-based key derivation using Argon2id

use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::secure_memory::{DerivedKey, KEY_LEN};
use crate::error::{Result, VaultError};

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Parameters for Argon2id key derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64MB)
    pub memory_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost_kib: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests. Never use these for a real vault.
    pub fn insecure_fast() -> Self {
        Self {
            memory_cost_kib: 8192,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Random per-vault salt
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Generate a cryptographically secure random salt
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; SALT_LEN] = bytes
            .try_into()
            .map_err(|_| VaultError::InvalidSalt { expected: SALT_LEN })?;
        Ok(Self(bytes))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes =
            hex::decode(s).map_err(|_| VaultError::InvalidSalt { expected: SALT_LEN })?;
        Self::from_slice(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Salt({})", self.to_hex())
    }
}

/// Derive a 256-bit key from a password using Argon2id
///
/// # Arguments
/// * `password` - The master password, must not be empty
/// * `salt` - Exactly [`SALT_LEN`] bytes, as stored in the master record
/// * `params` - Argon2id cost parameters
///
/// # Returns
/// A 32-byte key suitable for AES-256-GCM. Deterministic for equal inputs.
pub fn derive_key(password: &[u8], salt: &[u8], params: &KdfParams) -> Result<DerivedKey> {
    if salt.len() != SALT_LEN {
        return Err(VaultError::InvalidSalt { expected: SALT_LEN });
    }
    if password.is_empty() {
        return Err(VaultError::KeyDerivation(
            "password must not be empty".to_string(),
        ));
    }

    let argon2_params = Params::new(
        params.memory_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    // Derive straight into the key so no intermediate buffer outlives this call
    let mut key = DerivedKey::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, key.as_mut_bytes())
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

    Ok(key)
}

/// Run [`derive_key`] on the blocking pool so a slow derivation does not stall
/// the async runtime.
pub async fn derive_key_blocking(
    password: &[u8],
    salt: Salt,
    params: KdfParams,
) -> Result<DerivedKey> {
    let password = Zeroizing::new(password.to_vec());
    tokio::task::spawn_blocking(move || derive_key(&password, salt.as_bytes(), &params))
        .await
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?
}
