//! Error types for vault-core

use thiserror::Error;

/// Result type alias for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Invalid salt: expected {expected} bytes")]
    InvalidSalt { expected: usize },

    #[error("Wrong master password")]
    WrongPassword,

    /// Authentication failed for a ciphertext. Carries no detail on purpose.
    #[error("Decryption failed - corrupt or wrong-key record")]
    DecryptionFailed,

    #[error("Corrupt vault, rotation aborted: {0}")]
    CorruptVault(String),

    #[error("Storage error: {0}")]
    StoreError(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Vault has no master password - enroll first")]
    NotEnrolled,

    #[error("Vault already has a master password")]
    AlreadyEnrolled,

    #[error("Vault is locked - unlock with the master password first")]
    VaultLocked,

    #[error("Master password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    #[error("A credential named '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl VaultError {
    /// Whether the user can simply try again (e.g. retype a password).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::WrongPassword | Self::WeakPassword { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_errors_are_retryable() {
        assert!(VaultError::WrongPassword.is_retryable());
        assert!(VaultError::WeakPassword { min: 8 }.is_retryable());

        assert!(!VaultError::DecryptionFailed.is_retryable());
        assert!(!VaultError::StoreError("disk full".to_string()).is_retryable());
        assert!(!VaultError::NotEnrolled.is_retryable());
    }
}
