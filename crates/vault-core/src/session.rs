//! Unlocked session
//!
//! The derived key lives only here. It is handed to the cipher by reference
//! for each operation and overwritten when the session locks or a rotation
//! supersedes it.

use tracing::debug;

use crate::crypto::DerivedKey;
use crate::error::{Result, VaultError};

/// An unlocked vault session bound to one key epoch
#[derive(Debug)]
pub struct Session {
    key: DerivedKey,
    epoch: u64,
}

impl Session {
    pub fn new(key: DerivedKey, epoch: u64) -> Self {
        debug!("Session opened at epoch {}", epoch);
        Self { key, epoch }
    }

    /// Borrow the key for a single operation
    pub fn key(&self) -> Result<&DerivedKey> {
        if self.key.is_live() {
            Ok(&self.key)
        } else {
            Err(VaultError::VaultLocked)
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_active(&self) -> bool {
        self.key.is_live()
    }

    /// Adopt the key produced by a rotation. The previous key is zeroed.
    pub fn replace_key(&mut self, key: DerivedKey, epoch: u64) {
        self.key.invalidate();
        self.key = key;
        self.epoch = epoch;
        debug!("Session moved to epoch {}", epoch);
    }

    /// Overwrite the key. Every later operation fails with `VaultLocked`.
    pub fn invalidate(&mut self) {
        self.key.invalidate();
        debug!("Session invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_available_while_active() {
        let session = Session::new(DerivedKey::new([5u8; 32]), 1);

        assert!(session.is_active());
        assert_eq!(session.key().unwrap().as_bytes(), &[5u8; 32]);
        assert_eq!(session.epoch(), 1);
    }

    #[test]
    fn test_invalidate_locks_session() {
        let mut session = Session::new(DerivedKey::new([5u8; 32]), 1);
        session.invalidate();

        assert!(!session.is_active());
        assert!(matches!(session.key(), Err(VaultError::VaultLocked)));
    }

    #[test]
    fn test_replace_key_adopts_new_epoch() {
        let mut session = Session::new(DerivedKey::new([5u8; 32]), 1);
        session.replace_key(DerivedKey::new([6u8; 32]), 2);

        assert_eq!(session.epoch(), 2);
        assert_eq!(session.key().unwrap().as_bytes(), &[6u8; 32]);
    }
}
