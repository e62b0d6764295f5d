//! Storage trait definitions

use async_trait::async_trait;

use crate::crypto::{Salt, VerifierToken};
use crate::error::{Result, VaultError};
use crate::record::{CredentialRecord, MasterRecord};

/// Durable storage consumed by the vault core.
///
/// Implementations enforce name uniqueness and guarantee that
/// [`atomic_update`](VaultStore::atomic_update) is all-or-nothing.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Current master record, `None` before enrollment
    async fn get_master(&self) -> Result<Option<MasterRecord>>;

    /// Store the first master record. Fails with `AlreadyEnrolled` if one
    /// exists: replacing it is only possible through `atomic_update`.
    async fn set_master(&self, master: MasterRecord) -> Result<()>;

    /// All stored credentials, in insertion order
    async fn list_records(&self) -> Result<Vec<CredentialRecord>>;

    /// Look up a credential by its unique name
    async fn get_record_by_name(&self, name: &str) -> Result<Option<CredentialRecord>>;

    /// Insert, or overwrite the record with the same id
    async fn put_record(&self, record: CredentialRecord) -> Result<()>;

    /// Delete by name. Returns whether a record was removed.
    async fn delete_record(&self, name: &str) -> Result<bool>;

    /// Replace the master record and the full record set in one commit.
    ///
    /// On error the store is exactly as it was before the call.
    async fn atomic_update(
        &self,
        master: MasterRecord,
        records: Vec<CredentialRecord>,
    ) -> Result<()>;

    /// Get a human-readable name for this storage backend
    fn backend_name(&self) -> &'static str;

    async fn get_salt(&self) -> Result<Salt> {
        self.get_master()
            .await?
            .ok_or(VaultError::NotEnrolled)?
            .salt()
    }

    async fn get_verifier(&self) -> Result<VerifierToken> {
        self.get_master()
            .await?
            .ok_or(VaultError::NotEnrolled)?
            .verifier()
    }
}
