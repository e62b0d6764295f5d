//! Master password prompts

use anyhow::{bail, Context};
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::warn;

use vault_core::{SecretString, Vault, VaultError, VaultState};

/// Second entry of a confirmed password differed from the first
#[derive(Debug, Error)]
#[error("Passwords do not match")]
pub struct PasswordMismatch;

/// Where answers to prompts come from
pub trait Terminal: Send {
    /// Read a line without echo
    fn read_hidden(&mut self, prompt: &str) -> std::io::Result<String>;

    /// Read a visible line, without its trailing newline
    fn read_line(&mut self, prompt: &str) -> std::io::Result<String>;
}

/// The controlling terminal
pub struct Tty;

impl Terminal for Tty {
    fn read_hidden(&mut self, prompt: &str) -> std::io::Result<String> {
        rpassword::prompt_password(prompt)
    }

    fn read_line(&mut self, prompt: &str) -> std::io::Result<String> {
        print!("{}", prompt);
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Reads passwords and confirmations. A password given on the command line is
/// used once, for the first enroll or unlock attempt.
pub struct Prompter {
    preset: Option<SecretString>,
    terminal: Box<dyn Terminal>,
}

impl Prompter {
    pub fn new(preset: Option<String>) -> Self {
        Self::with_terminal(preset, Box::new(Tty))
    }

    pub fn with_terminal(preset: Option<String>, terminal: Box<dyn Terminal>) -> Self {
        Self {
            preset: preset.map(SecretString::from),
            terminal,
        }
    }

    /// Prompt without echo
    pub fn secret(&mut self, prompt: &str) -> anyhow::Result<SecretString> {
        let value = self
            .terminal
            .read_hidden(prompt)
            .context("Failed to read password")?;
        Ok(SecretString::from(value))
    }

    /// Prompt twice and require both entries to match
    pub fn confirmed(&mut self, prompt: &str) -> anyhow::Result<SecretString> {
        let first = self.secret(prompt)?;
        let second = self.secret("Repeat to confirm: ")?;
        if first != second {
            return Err(PasswordMismatch.into());
        }
        Ok(first)
    }

    /// Ask a yes/no question. Anything but `y` or `yes` is a no.
    pub fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        let answer = self
            .terminal
            .read_line(&format!("{} (y/n): ", question))
            .context("Failed to read answer")?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    fn master(&mut self, fresh: bool) -> anyhow::Result<SecretString> {
        match self.preset.take() {
            Some(preset) => Ok(preset),
            None if fresh => self.confirmed("New master password: "),
            None => self.secret("Master password: "),
        }
    }
}

/// Bring the vault to the unlocked state, enrolling first if it is empty
pub async fn open_session(vault: &mut Vault, prompter: &mut Prompter) -> anyhow::Result<()> {
    match vault.state() {
        VaultState::Unlocked => Ok(()),
        VaultState::NotEnrolled => {
            println!("No vault found. Choose a master password to create one.");
            enroll(vault, prompter).await
        }
        VaultState::Locked => unlock(vault, prompter).await,
    }
}

/// Set the master password of an empty vault. A too-short password or a
/// mismatched confirmation is asked for again.
pub async fn enroll(vault: &mut Vault, prompter: &mut Prompter) -> anyhow::Result<()> {
    let attempts = vault.settings().max_unlock_attempts.max(1);

    for _ in 0..attempts {
        let password = match prompter.master(true) {
            Ok(password) => password,
            Err(e) if e.is::<PasswordMismatch>() => {
                eprintln!("{}, try again", e);
                continue;
            }
            Err(e) => return Err(e),
        };

        match vault.enroll(password.expose()).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() => eprintln!("{}", e),
            Err(e) => return Err(e.into()),
        }
    }

    bail!("No acceptable master password given");
}

/// Unlock with up to `max_unlock_attempts` tries
pub async fn unlock(vault: &mut Vault, prompter: &mut Prompter) -> anyhow::Result<()> {
    let attempts = vault.settings().max_unlock_attempts.max(1);

    for attempt in 1..=attempts {
        let password = prompter.master(false)?;
        match vault.unlock(password.expose()).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() => {
                warn!("Unlock attempt {} of {} failed", attempt, attempts);
                eprintln!("{} ({}/{})", e, attempt, attempts);
            }
            Err(e) => return Err(e.into()),
        }
    }

    bail!("Too many failed unlock attempts");
}
