//! Key and secret containers that wipe themselves

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Symmetric key derived from the master password, zeroed when dropped.
///
/// Not `Clone`. A session owns the only copy and overwrites it when it locks
/// or a rotation replaces it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
    #[zeroize(skip)]
    live: bool,
}

impl DerivedKey {
    /// Create a key from raw bytes
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key, live: true }
    }

    /// Raw key bytes for the cipher
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.key
    }

    /// Overwrite the key material now instead of waiting for drop.
    pub fn invalidate(&mut self) {
        self.key.zeroize();
        self.live = false;
    }

    /// False once [`invalidate`](Self::invalidate) has run
    pub fn is_live(&self) -> bool {
        self.live
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .field("live", &self.live)
            .finish()
    }
}

/// Plaintext string wiped on drop and redacted in `Debug`
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: String) -> Self {
        Self { value }
    }

    /// Borrow the plaintext
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretString")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_zeroes_key() {
        let mut key = DerivedKey::new([42u8; KEY_LEN]);
        assert!(key.is_live());

        key.invalidate();

        assert!(!key.is_live());
        assert_eq!(key.as_bytes(), &[0u8; KEY_LEN]);
    }

    #[test]
    fn test_secret_string_expose() {
        let secret = SecretString::from("my-secret");
        assert_eq!(secret.expose(), "my-secret");
        assert!(!secret.is_empty());
    }

    #[test]
    fn test_debug_redacted() {
        let key = DerivedKey::new([7u8; KEY_LEN]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains('7'));

        let secret = SecretString::from("hunter2");
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }
}
