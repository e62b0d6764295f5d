//! Vault commands shared by the one-shot CLI and the shell

use clap::Subcommand;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

use crate::prompt::Prompter;
use vault_core::{CredentialInput, SecretString, Vault, VaultError};

#[derive(Subcommand)]
pub enum Command {
    /// Add a credential. An empty password is replaced by a generated one.
    Add {
        name: String,

        #[arg(short, long, default_value = "")]
        username: String,

        #[arg(short, long, default_value = "")]
        notes: String,

        /// Generate the password without prompting
        #[arg(short, long)]
        generate: bool,
    },
    /// Show a credential, including its password
    Get { name: String },
    /// List credential names
    List,
    /// Delete a credential
    Delete {
        name: String,

        /// Skip the confirmation question
        #[arg(short, long)]
        yes: bool,
    },
    /// Export every credential to a plaintext CSV file
    Export {
        #[arg(default_value = "export.csv")]
        path: PathBuf,
    },
    /// Change the master password and re-encrypt every credential
    ChangeMaster,
}

// Username and notes are record plaintext and stay out of logs
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { name, generate, .. } => f
                .debug_struct("Add")
                .field("name", name)
                .field("username", &"[REDACTED]")
                .field("notes", &"[REDACTED]")
                .field("generate", generate)
                .finish(),
            Self::Get { name } => f.debug_struct("Get").field("name", name).finish(),
            Self::List => f.write_str("List"),
            Self::Delete { name, yes } => f
                .debug_struct("Delete")
                .field("name", name)
                .field("yes", yes)
                .finish(),
            Self::Export { path } => f.debug_struct("Export").field("path", path).finish(),
            Self::ChangeMaster => f.write_str("ChangeMaster"),
        }
    }
}

/// Run one command against an unlocked vault
pub async fn run(command: Command, vault: &mut Vault, prompter: &mut Prompter) -> anyhow::Result<()> {
    debug!("Running {:?}", command);

    match command {
        Command::Add {
            name,
            username,
            notes,
            generate,
        } => {
            let secret = if generate {
                SecretString::default()
            } else {
                prompter.secret("Password (leave empty to generate): ")?
            };
            let input = CredentialInput::new(&name, &username, secret.expose()).with_notes(&notes);
            let added = vault.add_credential(input).await?;

            println!("Added '{}'", added.summary.name);
            if let Some(generated) = added.generated_secret {
                println!("Generated password: {}", generated.expose());
            }
        }
        Command::Get { name } => {
            let credential = vault
                .get_credential(&name)
                .await?
                .ok_or(VaultError::CredentialNotFound(name))?;

            println!("Name:     {}", credential.name);
            println!("Username: {}", credential.username.expose());
            println!("Password: {}", credential.secret.expose());
            if !credential.notes.is_empty() {
                println!("Notes:    {}", credential.notes.expose());
            }
            println!("Added:    {}", credential.created_at.format("%Y-%m-%d %H:%M UTC"));
        }
        Command::List => {
            let summaries = vault.list_credentials().await?;
            if summaries.is_empty() {
                println!("No credentials stored");
            }
            for summary in summaries {
                println!("{}  (added {})", summary.name, summary.created_at.format("%Y-%m-%d"));
            }
        }
        Command::Delete { name, yes } => {
            if !yes && !prompter.confirm(&format!("Delete '{}'?", name))? {
                println!("Cancelled");
                return Ok(());
            }
            if !vault.delete_credential(&name).await? {
                return Err(VaultError::CredentialNotFound(name).into());
            }
            println!("Deleted '{}'", name);
        }
        Command::Export { path } => {
            let count = vault.export_csv(&path).await?;
            println!("Exported {} credentials to {}", count, path.display());
            eprintln!("Warning: the export is not encrypted. Delete it when you are done.");
        }
        Command::ChangeMaster => {
            let current = prompter.secret("Current master password: ")?;
            let new = prompter.confirmed("New master password: ")?;
            vault
                .change_master_password(current.expose(), new.expose())
                .await?;
            println!("Master password changed");
        }
    }

    Ok(())
}
