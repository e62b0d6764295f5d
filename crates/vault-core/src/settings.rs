//! Vault settings
//!
//! Non-sensitive configuration kept as plain JSON beside the vault file, so
//! it can be read before anything is unlocked.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::crypto::KdfParams;
use crate::error::Result;

const SETTINGS_FILE: &str = "settings.json";

/// Vault settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub version: u32,
    /// Shortest master password accepted at enrollment and rotation
    pub min_password_length: usize,
    /// Unlock attempts the CLI allows before giving up
    pub max_unlock_attempts: u32,
    /// Length of generated credential passwords
    pub generated_password_length: usize,
    /// Argon2id costs for newly derived keys. Existing vaults keep the
    /// parameters recorded in their master record until the next rotation.
    pub kdf: KdfParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            min_password_length: 8,
            max_unlock_attempts: 3,
            generated_password_length: 20,
            kdf: KdfParams::default(),
        }
    }
}

impl Settings {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE)
    }

    /// Read `settings.json` from `dir`. A missing file yields the defaults and
    /// missing keys take their default values.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::path_in(dir);
        if !path.exists() {
            debug!("{:?} absent, default settings in effect", path);
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let settings = serde_json::from_str(&raw)?;
        debug!("Settings read from {:?}", path);
        Ok(settings)
    }

    /// Write `settings.json` into `dir` through a temp file and rename
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::path_in(dir);
        let staging = path.with_extension("json.tmp");

        std::fs::write(&staging, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&staging, &path)?;

        debug!("Settings written to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path()).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.min_password_length, 8);
        assert_eq!(settings.max_unlock_attempts, 3);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            min_password_length: 12,
            kdf: KdfParams::insecure_fast(),
            ..Settings::default()
        };

        settings.save(dir.path()).unwrap();

        assert_eq!(Settings::load(dir.path()).unwrap(), settings);
        assert!(!dir.path().join("settings.json.tmp").exists());
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            Settings::path_in(dir.path()),
            r#"{ "maxUnlockAttempts": 5 }"#,
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.max_unlock_attempts, 5);
        assert_eq!(settings.min_password_length, 8);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(Settings::path_in(dir.path()), "{ nope").unwrap();

        assert!(Settings::load(dir.path()).is_err());
    }
}
