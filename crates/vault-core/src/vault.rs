//! Main vault orchestration

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::crypto::{
    decrypt_string, derive_key_blocking, encrypt_string, verifier, DerivedKey, Salt, SecretString,
};
use crate::error::{Result, VaultError};
use crate::export;
use crate::generator::generate_password;
use crate::record::{
    CredentialInput, CredentialRecord, CredentialSummary, DecryptedCredential, MasterRecord,
};
use crate::rotation::{self, verify_password};
use crate::session::Session;
use crate::settings::Settings;
use crate::storage::{FileVaultStore, VaultStore};

/// Vault state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// No master password has been set yet
    NotEnrolled,
    /// Enrolled, master password required
    Locked,
    /// Unlocked and ready
    Unlocked,
}

/// A newly added credential
#[derive(Debug)]
pub struct AddedCredential {
    pub summary: CredentialSummary,
    /// Set when the secret was left empty and one was generated
    pub generated_secret: Option<SecretString>,
}

/// Main vault struct: owns the store handle and, while unlocked, the session
pub struct Vault {
    store: Arc<dyn VaultStore>,
    settings: Settings,
    /// Present only while unlocked
    session: Option<Session>,
    state: VaultState,
}

impl Vault {
    /// Open the vault and its settings in `dir`
    pub async fn open_dir(dir: PathBuf) -> Result<Self> {
        let settings = Settings::load(&dir)?;
        let store = FileVaultStore::open(dir).await?;
        Self::with_store(Arc::new(store), settings).await
    }

    /// Create a vault over any storage backend
    pub async fn with_store(store: Arc<dyn VaultStore>, settings: Settings) -> Result<Self> {
        let state = if store.get_master().await?.is_some() {
            VaultState::Locked
        } else {
            VaultState::NotEnrolled
        };
        debug!("Vault opened on {} ({:?})", store.backend_name(), state);

        Ok(Self {
            store,
            settings,
            session: None,
            state,
        })
    }

    /// Get the current vault state
    pub fn state(&self) -> VaultState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == VaultState::Unlocked
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Key epoch of the unlocked session
    pub fn epoch(&self) -> Option<u64> {
        self.session.as_ref().map(Session::epoch)
    }

    fn check_password_policy(&self, password: &str) -> Result<()> {
        let min = self.settings.min_password_length;
        if password.chars().count() < min {
            return Err(VaultError::WeakPassword { min });
        }
        Ok(())
    }

    fn key(&self) -> Result<&DerivedKey> {
        self.session
            .as_ref()
            .ok_or(VaultError::VaultLocked)?
            .key()
    }

    /// Set the master password of an empty vault and unlock it
    pub async fn enroll(&mut self, password: &str) -> Result<()> {
        if self.state != VaultState::NotEnrolled {
            return Err(VaultError::AlreadyEnrolled);
        }
        self.check_password_policy(password)?;

        info!("Enrolling new master password");

        let salt = Salt::generate();
        let kdf = self.settings.kdf;
        let key = derive_key_blocking(password.as_bytes(), salt, kdf).await?;
        let master = MasterRecord::new(&salt, &verifier::create(&key), 1, kdf);

        self.store.set_master(master).await?;

        self.session = Some(Session::new(key, 1));
        self.state = VaultState::Unlocked;

        info!("Vault enrolled at epoch 1");
        Ok(())
    }

    /// Unlock with the master password.
    ///
    /// A wrong password is rejected by the verifier alone; no record is read.
    /// An already unlocked session is kept if the attempt fails.
    pub async fn unlock(&mut self, password: &str) -> Result<()> {
        let master = self
            .store
            .get_master()
            .await?
            .ok_or(VaultError::NotEnrolled)?;

        let key = verify_password(&master, password.as_bytes()).await?;

        if let Some(mut previous) = self.session.take() {
            previous.invalidate();
        }
        self.session = Some(Session::new(key, master.epoch));
        self.state = VaultState::Unlocked;

        info!("Vault unlocked");
        Ok(())
    }

    /// Lock the vault (zero the key in memory)
    pub fn lock(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.invalidate();
        }
        if self.state == VaultState::Unlocked {
            self.state = VaultState::Locked;
            info!("Vault locked");
        }
    }

    /// Change the master password, re-encrypting every record.
    ///
    /// On success the session holds the new key. On failure the vault and the
    /// session are unchanged.
    pub async fn change_master_password(&mut self, old: &str, new: &str) -> Result<()> {
        if self.state == VaultState::NotEnrolled {
            return Err(VaultError::NotEnrolled);
        }
        self.check_password_policy(new)?;

        let outcome = rotation::rotate(
            old.as_bytes(),
            new.as_bytes(),
            self.store.as_ref(),
            &self.settings.kdf,
        )
        .await?;

        let session = match self.session.take() {
            Some(mut session) => {
                session.replace_key(outcome.key, outcome.epoch);
                session
            }
            None => Session::new(outcome.key, outcome.epoch),
        };
        self.session = Some(session);
        self.state = VaultState::Unlocked;

        info!("Master password changed");
        Ok(())
    }

    /// Encrypt and store a new credential. An empty secret is replaced by a
    /// generated password, returned in [`AddedCredential::generated_secret`].
    pub async fn add_credential(&self, input: CredentialInput) -> Result<AddedCredential> {
        let key = self.key()?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(VaultError::InvalidInput(
                "credential name must not be empty".to_string(),
            ));
        }

        let generated_secret = if input.secret.is_empty() {
            Some(generate_password(self.settings.generated_password_length))
        } else {
            None
        };
        let secret = generated_secret.as_ref().unwrap_or(&input.secret);

        let record = CredentialRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            username: encrypt_string(input.username.expose(), key)?,
            secret: encrypt_string(secret.expose(), key)?,
            notes: encrypt_string(input.notes.expose(), key)?,
            created_at: Utc::now(),
        };
        let summary = record.summary();

        self.store.put_record(record).await?;

        info!("Added credential: {}", summary.name);
        Ok(AddedCredential {
            summary,
            generated_secret,
        })
    }

    /// Get and decrypt a credential by name
    pub async fn get_credential(&self, name: &str) -> Result<Option<DecryptedCredential>> {
        let key = self.key()?;

        match self.store.get_record_by_name(name).await? {
            Some(record) => Ok(Some(decrypt_record(&record, key)?)),
            None => {
                debug!("Credential not found: {}", name);
                Ok(None)
            }
        }
    }

    /// List credential names without decrypting anything
    pub async fn list_credentials(&self) -> Result<Vec<CredentialSummary>> {
        self.key()?;

        let records = self.store.list_records().await?;
        Ok(records.iter().map(CredentialRecord::summary).collect())
    }

    /// Delete a credential by name. Returns whether it existed.
    pub async fn delete_credential(&self, name: &str) -> Result<bool> {
        self.key()?;

        let deleted = self.store.delete_record(name).await?;
        if deleted {
            info!("Deleted credential: {}", name);
        }
        Ok(deleted)
    }

    /// Decrypt every credential
    pub async fn export_all(&self) -> Result<Vec<DecryptedCredential>> {
        let key = self.key()?;

        self.store
            .list_records()
            .await?
            .iter()
            .map(|record| decrypt_record(record, key))
            .collect()
    }

    /// Write every credential, decrypted, to a CSV file at `path`
    pub async fn export_csv(&self, path: &Path) -> Result<usize> {
        let credentials = self.export_all().await?;
        let file = std::fs::File::create(path)?;
        let count = export::write_csv(file, &credentials)?;

        info!("Exported {} credentials to {:?}", count, path);
        Ok(count)
    }
}

impl Drop for Vault {
    fn drop(&mut self) {
        self.lock();
    }
}

fn decrypt_record(record: &CredentialRecord, key: &DerivedKey) -> Result<DecryptedCredential> {
    Ok(DecryptedCredential {
        id: record.id,
        name: record.name.clone(),
        username: decrypt_string(&record.username, key)?,
        secret: decrypt_string(&record.secret, key)?,
        notes: decrypt_string(&record.notes, key)?,
        created_at: record.created_at,
    })
}
