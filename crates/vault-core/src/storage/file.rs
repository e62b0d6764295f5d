//! File-backed vault store
//!
//! The whole vault (master record plus every credential) lives in one JSON
//! document. Every mutation writes a complete new document to `vault.json.tmp`,
//! syncs it, and renames it over `vault.json`. Since the rename is atomic, the
//! file on disk is always either the old or the new document, which is what
//! makes [`VaultStore::atomic_update`] all-or-nothing across crashes.

use async_trait::async_trait;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::VaultStore;
use crate::error::{Result, VaultError};
use crate::record::{CredentialRecord, MasterRecord};

const FORMAT_VERSION: u32 = 1;
const VAULT_FILE: &str = "vault.json";

/// On-disk vault document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultDocument {
    version: u32,
    master: Option<MasterRecord>,
    records: Vec<CredentialRecord>,
}

impl Default for VaultDocument {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            master: None,
            records: Vec::new(),
        }
    }
}

/// JSON file storage backend
pub struct FileVaultStore {
    storage_dir: PathBuf,
    /// In-memory copy of the committed document
    cache: Arc<RwLock<VaultDocument>>,
    #[cfg(test)]
    fail_next_commit: std::sync::atomic::AtomicBool,
}

impl FileVaultStore {
    /// Open (or create) the store in `storage_dir` and load any existing vault
    pub async fn open(storage_dir: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&storage_dir).await?;

        let store = Self {
            storage_dir,
            cache: Arc::new(RwLock::new(VaultDocument::default())),
            #[cfg(test)]
            fail_next_commit: std::sync::atomic::AtomicBool::new(false),
        };
        store.load().await?;

        debug!("Vault store opened at: {:?}", store.storage_dir);
        Ok(store)
    }

    /// Get the default storage directory
    pub fn default_dir() -> Result<PathBuf> {
        ProjectDirs::from("org", "pwvault", "pwvault")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| {
                VaultError::StoreError("Could not determine data directory".to_string())
            })
    }

    fn vault_file_path(&self) -> PathBuf {
        self.storage_dir.join(VAULT_FILE)
    }

    fn temp_file_path(&self) -> PathBuf {
        self.vault_file_path().with_extension("json.tmp")
    }

    /// Load the committed document from disk
    async fn load(&self) -> Result<()> {
        let temp_path = self.temp_file_path();
        if tokio::fs::try_exists(&temp_path).await? {
            // Left behind by a write that never reached the rename
            warn!("Discarding uncommitted vault write at {:?}", temp_path);
            tokio::fs::remove_file(&temp_path).await?;
        }

        let path = self.vault_file_path();
        if !tokio::fs::try_exists(&path).await? {
            debug!("No existing vault file found");
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let document: VaultDocument = serde_json::from_str(&contents)?;
        if document.version != FORMAT_VERSION {
            return Err(VaultError::StoreError(format!(
                "Unsupported vault format version {}",
                document.version
            )));
        }

        debug!("Loaded {} records from vault file", document.records.len());
        *self.cache.write().await = document;
        Ok(())
    }

    /// Write a complete document to disk via temp file + rename
    async fn persist(&self, document: &VaultDocument) -> Result<()> {
        let contents = serde_json::to_vec_pretty(document)?;
        let path = self.vault_file_path();
        let temp_path = self.temp_file_path();

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        drop(file);

        #[cfg(test)]
        self.injected_failure()?;

        tokio::fs::rename(&temp_path, &path).await?;
        if let Err(e) = sync_dir(&self.storage_dir).await {
            warn!("Vault directory sync failed after rename: {}", e);
        }

        debug!("Saved {} records to vault file", document.records.len());
        Ok(())
    }

    /// Apply `change` to a copy of the document and commit it.
    ///
    /// The cache only adopts the new document once it is on disk, so a failed
    /// write leaves both memory and disk untouched.
    async fn commit<T: Send>(
        &self,
        change: impl FnOnce(&mut VaultDocument) -> Result<T> + Send,
    ) -> Result<T> {
        let mut cache = self.cache.write().await;
        let mut candidate = cache.clone();
        let output = change(&mut candidate)?;

        self.persist(&candidate).await.map_err(|e| match e {
            VaultError::StoreError(_) => e,
            other => VaultError::StoreError(other.to_string()),
        })?;

        *cache = candidate;
        Ok(output)
    }

    /// Make the next commit fail after the temp file is written
    #[cfg(test)]
    pub(crate) fn fail_next_commit(&self) {
        self.fail_next_commit
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn injected_failure(&self) -> Result<()> {
        if self
            .fail_next_commit
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(VaultError::StoreError(
                "simulated crash before rename".to_string(),
            ));
        }
        Ok(())
    }
}

/// Flush the directory entry so the rename itself is durable
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl VaultStore for FileVaultStore {
    async fn get_master(&self) -> Result<Option<MasterRecord>> {
        Ok(self.cache.read().await.master.clone())
    }

    async fn set_master(&self, master: MasterRecord) -> Result<()> {
        self.commit(|doc| {
            if doc.master.is_some() {
                return Err(VaultError::AlreadyEnrolled);
            }
            doc.master = Some(master);
            Ok(())
        })
        .await
    }

    async fn list_records(&self) -> Result<Vec<CredentialRecord>> {
        Ok(self.cache.read().await.records.clone())
    }

    async fn get_record_by_name(&self, name: &str) -> Result<Option<CredentialRecord>> {
        let cache = self.cache.read().await;
        Ok(cache.records.iter().find(|r| r.name == name).cloned())
    }

    async fn put_record(&self, record: CredentialRecord) -> Result<()> {
        self.commit(|doc| {
            if doc
                .records
                .iter()
                .any(|r| r.name == record.name && r.id != record.id)
            {
                return Err(VaultError::DuplicateName(record.name));
            }
            match doc.records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => doc.records.push(record),
            }
            Ok(())
        })
        .await?;

        debug!("Stored record");
        Ok(())
    }

    async fn delete_record(&self, name: &str) -> Result<bool> {
        {
            let cache = self.cache.read().await;
            if !cache.records.iter().any(|r| r.name == name) {
                return Ok(false);
            }
        }

        self.commit(|doc| {
            let before = doc.records.len();
            doc.records.retain(|r| r.name != name);
            Ok(doc.records.len() != before)
        })
        .await
    }

    async fn atomic_update(
        &self,
        master: MasterRecord,
        records: Vec<CredentialRecord>,
    ) -> Result<()> {
        let mut names = HashSet::new();
        if let Some(dup) = records.iter().find(|r| !names.insert(r.name.as_str())) {
            return Err(VaultError::StoreError(format!(
                "duplicate record name in update: {}",
                dup.name
            )));
        }

        let count = records.len();
        self.commit(move |doc| {
            doc.master = Some(master);
            doc.records = records;
            Ok(())
        })
        .await?;

        debug!("Committed master record and {} records atomically", count);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "JSON File Storage"
    }
}
