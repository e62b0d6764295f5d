//! Record type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{KdfParams, Salt, SecretString, VerifierToken};
use crate::error::Result;

/// The single per-vault master row: salt and verifier for the current key epoch.
///
/// Never holds the password or the key. Replaced wholesale on rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterRecord {
    /// Hex-encoded salt
    pub salt: String,
    /// Hex-encoded verifier token
    pub verifier: String,
    /// Key generation, 1 after enrollment, +1 per rotation
    pub epoch: u64,
    /// Argon2id parameters the key was derived with
    pub kdf: KdfParams,
}

impl MasterRecord {
    pub fn new(salt: &Salt, verifier: &VerifierToken, epoch: u64, kdf: KdfParams) -> Self {
        Self {
            salt: salt.to_hex(),
            verifier: verifier.to_hex(),
            epoch,
            kdf,
        }
    }

    pub fn salt(&self) -> Result<Salt> {
        Salt::from_hex(&self.salt)
    }

    pub fn verifier(&self) -> Result<VerifierToken> {
        VerifierToken::from_hex(&self.verifier)
    }
}

/// Stored credential. The three secret fields are encrypted independently
/// (nonce:tag:ciphertext format), the rest is kept in clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Unique, stable identifier
    pub id: Uuid,
    /// Unique label used for lookup (e.g. "Gmail")
    pub name: String,
    pub username: String,
    pub secret: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn summary(&self) -> CredentialSummary {
        CredentialSummary {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

/// Listing view of a credential, readable without the key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Plaintext input for a new credential
#[derive(Debug, Clone, Default)]
pub struct CredentialInput {
    pub name: String,
    pub username: SecretString,
    /// Left empty to have a password generated
    pub secret: SecretString,
    pub notes: SecretString,
}

impl CredentialInput {
    pub fn new(name: &str, username: &str, secret: &str) -> Self {
        Self {
            name: name.to_string(),
            username: username.into(),
            secret: secret.into(),
            notes: SecretString::default(),
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Decrypted credential - secret fields are zeroed when dropped
#[derive(Debug, Clone)]
pub struct DecryptedCredential {
    pub id: Uuid,
    pub name: String,
    pub username: SecretString,
    pub secret: SecretString,
    pub notes: SecretString,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{verifier, DerivedKey};

    #[test]
    fn test_master_record_parses_back() {
        let salt = Salt::generate();
        let token = verifier::create(&DerivedKey::new([3u8; 32]));
        let master = MasterRecord::new(&salt, &token, 1, KdfParams::default());

        assert_eq!(master.salt().unwrap(), salt);
        assert_eq!(master.verifier().unwrap(), token);
    }

    #[test]
    fn test_master_record_json_is_camel_case() {
        let salt = Salt::generate();
        let token = verifier::create(&DerivedKey::new([3u8; 32]));
        let master = MasterRecord::new(&salt, &token, 4, KdfParams::insecure_fast());

        let json = serde_json::to_value(&master).unwrap();
        assert_eq!(json["epoch"], 4);
        assert_eq!(json["kdf"]["memoryCostKib"], 8192);
    }

    #[test]
    fn test_decrypted_debug_is_redacted() {
        let credential = DecryptedCredential {
            id: Uuid::new_v4(),
            name: "Gmail".to_string(),
            username: "a@b.com".into(),
            secret: "p@ss".into(),
            notes: SecretString::default(),
            created_at: Utc::now(),
        };

        let debug = format!("{:?}", credential);
        assert!(debug.contains("Gmail"));
        assert!(!debug.contains("p@ss"));
        assert!(!debug.contains("a@b.com"));
    }
}
