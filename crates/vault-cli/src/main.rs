//! pwvault - local password vault
//!
//! Every credential is encrypted under a key derived from one master
//! password. Without a subcommand the binary opens an interactive shell.

mod commands;
mod prompt;
mod shell;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::Command;
use prompt::Prompter;
use vault_core::{FileVaultStore, Settings, Vault, VaultState};

/// pwvault - local password vault protected by a single master password
#[derive(Parser, Debug)]
#[command(name = "pwvault")]
#[command(version)]
#[command(about = "pwvault - local password vault protected by a single master password")]
struct Args {
    /// Vault directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "PWVAULT_DIR")]
    data_dir: Option<PathBuf>,

    /// Master password for the first unlock attempt, instead of prompting
    #[arg(long, global = true, env = "PWVAULT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<TopCommand>,
}

#[derive(Subcommand, Debug)]
enum TopCommand {
    /// Create a new vault and choose its master password
    Init,
    /// Interactive shell (the default)
    Shell,
    #[command(flatten)]
    Vault(Command),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let dir = match args.data_dir {
        Some(dir) => dir,
        None => FileVaultStore::default_dir()?,
    };
    let mut vault = Vault::open_dir(dir.clone())
        .await
        .with_context(|| format!("Failed to open vault at {}", dir.display()))?;
    let mut prompter = Prompter::new(args.password);

    match args.command.unwrap_or(TopCommand::Shell) {
        TopCommand::Init => {
            if vault.state() != VaultState::NotEnrolled {
                bail!("A vault already exists at {}", dir.display());
            }
            prompt::enroll(&mut vault, &mut prompter).await?;
            if !Settings::path_in(&dir).exists() {
                vault.settings().save(&dir)?;
            }
            println!("Vault created at {}", dir.display());
        }
        TopCommand::Shell => {
            prompt::open_session(&mut vault, &mut prompter).await?;
            shell::run(&mut vault, &mut prompter).await?;
        }
        TopCommand::Vault(command) => {
            prompt::open_session(&mut vault, &mut prompter).await?;
            commands::run(command, &mut vault, &mut prompter).await?;
        }
    }

    Ok(())
}

/// Logs go to stderr so they never mix with command output
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_shell() {
        let args = Args::try_parse_from(["pwvault"]).unwrap();
        assert!(args.command.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["pwvault", "list", "--data-dir", "/tmp/vault", "-v"]).unwrap();

        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/vault")));
        assert!(args.verbose);
        assert!(matches!(
            args.command,
            Some(TopCommand::Vault(Command::List))
        ));
    }

    #[test]
    fn test_change_master_subcommand_name() {
        let args = Args::try_parse_from(["pwvault", "change-master"]).unwrap();
        assert!(matches!(
            args.command,
            Some(TopCommand::Vault(Command::ChangeMaster))
        ));
    }
}
