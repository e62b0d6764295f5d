//! CSV export of decrypted credentials

use std::io::Write;

use crate::error::{Result, VaultError};
use crate::record::DecryptedCredential;

const HEADER: [&str; 6] = ["id", "name", "username", "password", "notes", "created_at"];

/// Write credentials as CSV with a header row. Returns the number of rows.
///
/// The output is plaintext. Callers decide where it goes.
pub fn write_csv<W: Write>(writer: W, credentials: &[DecryptedCredential]) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER).map_err(export_error)?;

    for credential in credentials {
        let id = credential.id.to_string();
        let created_at = credential.created_at.to_rfc3339();
        csv.write_record([
            id.as_str(),
            credential.name.as_str(),
            credential.username.expose(),
            credential.secret.expose(),
            credential.notes.expose(),
            created_at.as_str(),
        ])
        .map_err(export_error)?;
    }

    csv.flush()?;
    Ok(credentials.len())
}

fn export_error(e: csv::Error) -> VaultError {
    VaultError::Export(e.to_string())
}
