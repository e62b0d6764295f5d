//! Master password rotation
//!
//! Every record is decrypted under the old key before anything is written, and
//! the new master record and all re-encrypted records go to the store in one
//! [`VaultStore::atomic_update`]. A failure at any step leaves the store as it
//! was.

use tracing::{debug, info, warn};

use crate::crypto::{
    decrypt_string, derive_key_blocking, encrypt_string, verifier, DerivedKey, KdfParams, Salt,
    SecretString,
};
use crate::error::{Result, VaultError};
use crate::record::{CredentialRecord, MasterRecord};
use crate::storage::VaultStore;

/// Result of a committed rotation
#[derive(Debug)]
pub struct RotationOutcome {
    /// Key for the new epoch. The caller adopts it and discards the old one.
    pub key: DerivedKey,
    pub epoch: u64,
}

/// A record decrypted under the old key, waiting to be re-encrypted
struct OpenRecord {
    record: CredentialRecord,
    username: SecretString,
    secret: SecretString,
    notes: SecretString,
}

/// Derive the key for `password` and check it against the master verifier.
///
/// Costs one derivation; no record is touched.
pub(crate) async fn verify_password(master: &MasterRecord, password: &[u8]) -> Result<DerivedKey> {
    let salt = master.salt()?;
    let token = master.verifier()?;
    let key = derive_key_blocking(password, salt, master.kdf).await?;

    if !verifier::check(&key, &token) {
        return Err(VaultError::WrongPassword);
    }
    Ok(key)
}

/// Change the master password and re-encrypt every record under the new key.
///
/// `params` are the Argon2id costs for the new key, so a rotation can also
/// upgrade the KDF strength.
///
/// # Errors
/// * `WrongPassword` - `old_password` does not match; nothing was read or written
/// * `CorruptVault` - a record did not decrypt under the current key; nothing
///   was written
/// * `StoreError` - the commit failed; the store is unchanged
pub async fn rotate<S: VaultStore + ?Sized>(
    old_password: &[u8],
    new_password: &[u8],
    store: &S,
    params: &KdfParams,
) -> Result<RotationOutcome> {
    let master = store.get_master().await?.ok_or(VaultError::NotEnrolled)?;
    let mut old_key = verify_password(&master, old_password).await?;

    let records = store.list_records().await?;
    let opened = open_all(records, &old_key)?;
    old_key.invalidate();
    debug!("Decrypted {} records for rotation", opened.len());

    let new_salt = Salt::generate();
    let new_key = derive_key_blocking(new_password, new_salt, *params).await?;
    let epoch = master.epoch + 1;
    let new_master = MasterRecord::new(&new_salt, &verifier::create(&new_key), epoch, *params);

    let resealed = opened
        .into_iter()
        .map(|open| seal(open, &new_key))
        .collect::<Result<Vec<_>>>()?;
    let count = resealed.len();

    if let Err(e) = store.atomic_update(new_master, resealed).await {
        warn!("Rotation aborted at commit, vault left at epoch {}: {}", master.epoch, e);
        return Err(match e {
            VaultError::StoreError(_) => e,
            other => VaultError::StoreError(other.to_string()),
        });
    }

    info!("Master password rotated to epoch {} ({} records re-encrypted)", epoch, count);
    Ok(RotationOutcome {
        key: new_key,
        epoch,
    })
}

fn open_all(records: Vec<CredentialRecord>, key: &DerivedKey) -> Result<Vec<OpenRecord>> {
    records
        .into_iter()
        .map(|record| {
            let field = |ciphertext: &str| {
                decrypt_string(ciphertext, key).map_err(|_| {
                    VaultError::CorruptVault(format!(
                        "record '{}' does not decrypt under the current key",
                        record.name
                    ))
                })
            };
            let username = field(&record.username)?;
            let secret = field(&record.secret)?;
            let notes = field(&record.notes)?;
            Ok(OpenRecord {
                record,
                username,
                secret,
                notes,
            })
        })
        .collect()
}

fn seal(open: OpenRecord, key: &DerivedKey) -> Result<CredentialRecord> {
    Ok(CredentialRecord {
        username: encrypt_string(open.username.expose(), key)?,
        secret: encrypt_string(open.secret.expose(), key)?,
        notes: encrypt_string(open.notes.expose(), key)?,
        ..open.record
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_key;
    use crate::storage::FileVaultStore;
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn fast() -> KdfParams {
        KdfParams::insecure_fast()
    }

    /// Enrolled store with the given credentials, keyed by `password`
    async fn enrolled_store(
        password: &str,
        credentials: &[(&str, &str, &str)],
    ) -> (FileVaultStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileVaultStore::open(temp_dir.path().to_path_buf()).await.unwrap();

        let salt = Salt::generate();
        let key = derive_key(password.as_bytes(), salt.as_bytes(), &fast()).unwrap();
        store
            .set_master(MasterRecord::new(&salt, &verifier::create(&key), 1, fast()))
            .await
            .unwrap();

        for (name, username, secret) in credentials {
            store
                .put_record(CredentialRecord {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    username: encrypt_string(username, &key).unwrap(),
                    secret: encrypt_string(secret, &key).unwrap(),
                    notes: encrypt_string("", &key).unwrap(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        (store, temp_dir)
    }

    async fn key_for(store: &FileVaultStore, password: &str) -> DerivedKey {
        let master = store.get_master().await.unwrap().unwrap();
        derive_key(password.as_bytes(), master.salt().unwrap().as_bytes(), &master.kdf).unwrap()
    }

    #[tokio::test]
    async fn test_rotate_reencrypts_every_record() {
        let (store, _temp) = enrolled_store(
            "correcthorse1",
            &[("Gmail", "a@b.com", "p@ss"), ("Bank", "me", "1234")],
        )
        .await;

        let outcome = rotate(b"correcthorse1", b"newpassword2", &store, &fast())
            .await
            .unwrap();
        assert_eq!(outcome.epoch, 2);

        let new_key = key_for(&store, "newpassword2").await;
        assert_eq!(new_key.as_bytes(), outcome.key.as_bytes());
        assert!(verifier::check(&new_key, &store.get_verifier().await.unwrap()));

        let gmail = store.get_record_by_name("Gmail").await.unwrap().unwrap();
        assert_eq!(decrypt_string(&gmail.username, &new_key).unwrap().expose(), "a@b.com");
        assert_eq!(decrypt_string(&gmail.secret, &new_key).unwrap().expose(), "p@ss");

        for record in store.list_records().await.unwrap() {
            assert!(decrypt_string(&record.secret, &new_key).is_ok());
        }
    }

    #[tokio::test]
    async fn test_rotate_invalidates_old_password() {
        let (store, _temp) = enrolled_store("correcthorse1", &[("Gmail", "a@b.com", "p@ss")]).await;

        rotate(b"correcthorse1", b"newpassword2", &store, &fast())
            .await
            .unwrap();

        let old_key = key_for(&store, "correcthorse1").await;
        assert!(!verifier::check(&old_key, &store.get_verifier().await.unwrap()));

        let gmail = store.get_record_by_name("Gmail").await.unwrap().unwrap();
        assert!(decrypt_string(&gmail.secret, &old_key).is_err());
    }

    #[tokio::test]
    async fn test_rotate_preserves_identity_fields() {
        let (store, _temp) = enrolled_store("correcthorse1", &[("Gmail", "a@b.com", "p@ss")]).await;
        let before = store.get_record_by_name("Gmail").await.unwrap().unwrap();

        rotate(b"correcthorse1", b"newpassword2", &store, &fast())
            .await
            .unwrap();

        let after = store.get_record_by_name("Gmail").await.unwrap().unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_ne!(after.secret, before.secret);
    }

    #[tokio::test]
    async fn test_wrong_old_password_touches_nothing() {
        let (store, _temp) = enrolled_store("correcthorse1", &[("Gmail", "a@b.com", "p@ss")]).await;
        let master_before = store.get_master().await.unwrap();
        let records_before = store.list_records().await.unwrap();

        let result = rotate(b"wrongpass", b"newpassword2", &store, &fast()).await;

        assert!(matches!(result, Err(VaultError::WrongPassword)));
        assert_eq!(store.get_master().await.unwrap(), master_before);
        assert_eq!(store.list_records().await.unwrap(), records_before);
    }

    #[tokio::test]
    async fn test_undecryptable_record_aborts_as_corrupt() {
        let (store, _temp) = enrolled_store("correcthorse1", &[("Gmail", "a@b.com", "p@ss")]).await;

        // A record sealed under some unrelated key
        let foreign = DerivedKey::new([0xAB; 32]);
        store
            .put_record(CredentialRecord {
                id: Uuid::new_v4(),
                name: "Stray".to_string(),
                username: encrypt_string("x", &foreign).unwrap(),
                secret: encrypt_string("y", &foreign).unwrap(),
                notes: encrypt_string("z", &foreign).unwrap(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let master_before = store.get_master().await.unwrap();
        let records_before = store.list_records().await.unwrap();

        let result = rotate(b"correcthorse1", b"newpassword2", &store, &fast()).await;

        assert!(matches!(result, Err(VaultError::CorruptVault(msg)) if msg.contains("Stray")));
        assert_eq!(store.get_master().await.unwrap(), master_before);
        assert_eq!(store.list_records().await.unwrap(), records_before);
    }

    #[tokio::test]
    async fn test_interrupted_commit_keeps_pre_rotation_state() {
        let (store, temp) = enrolled_store(
            "correcthorse1",
            &[("Gmail", "a@b.com", "p@ss"), ("Bank", "me", "1234")],
        )
        .await;
        let master_before = store.get_master().await.unwrap().unwrap();
        let records_before = store.list_records().await.unwrap();

        store.fail_next_commit();
        let result = rotate(b"correcthorse1", b"newpassword2", &store, &fast()).await;
        assert!(matches!(result, Err(VaultError::StoreError(_))));

        // Both the live store and a fresh reopen see the complete old state
        let reopened = FileVaultStore::open(temp.path().to_path_buf()).await.unwrap();
        for view in [&store, &reopened] {
            assert_eq!(view.get_master().await.unwrap().unwrap(), master_before);
            assert_eq!(view.list_records().await.unwrap(), records_before);
        }

        let old_key = key_for(&reopened, "correcthorse1").await;
        for record in reopened.list_records().await.unwrap() {
            assert!(decrypt_string(&record.secret, &old_key).is_ok());
        }

        // And a retry goes through cleanly
        let outcome = rotate(b"correcthorse1", b"newpassword2", &reopened, &fast())
            .await
            .unwrap();
        assert_eq!(outcome.epoch, master_before.epoch + 1);
    }

    #[tokio::test]
    async fn test_rotate_empty_vault() {
        let (store, _temp) = enrolled_store("correcthorse1", &[]).await;

        let outcome = rotate(b"correcthorse1", b"newpassword2", &store, &fast())
            .await
            .unwrap();

        assert_eq!(outcome.epoch, 2);
        assert!(store.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rotate_not_enrolled() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileVaultStore::open(temp_dir.path().to_path_buf()).await.unwrap();

        let result = rotate(b"a", b"b", &store, &fast()).await;
        assert!(matches!(result, Err(VaultError::NotEnrolled)));
    }
}
