//! Interactive command loop

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::commands::{self, Command};
use crate::prompt::Prompter;
use vault_core::Vault;

#[derive(Parser, Debug)]
#[command(name = "pwvault", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    #[command(flatten)]
    Vault(Command),
    /// Lock the vault and leave the shell
    #[command(alias = "quit")]
    Exit,
}

/// Read commands from stdin until `exit` or EOF. A failed command prints its
/// error and the loop continues.
pub async fn run(vault: &mut Vault, prompter: &mut Prompter) -> anyhow::Result<()> {
    println!("pwvault shell. Type 'help' for commands, 'exit' to leave.");

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut line = String::new();

    loop {
        print!("pwvault> ");
        std::io::stdout().flush()?;

        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            debug!("EOF on stdin, leaving shell");
            println!();
            break;
        }

        let words = match split_line(&line) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                // Covers `help` as well as usage errors
                let _ = e.print();
                continue;
            }
        };

        match parsed.command {
            ShellCommand::Exit => break,
            ShellCommand::Vault(command) => {
                if let Err(e) = commands::run(command, vault, prompter).await {
                    eprintln!("Error: {:#}", e);
                }
            }
        }
    }

    vault.lock();
    Ok(())
}

/// Split a line into words. Single or double quotes group words with spaces.
fn split_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        bail!("Unterminated quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_words() {
        assert_eq!(split_line("get Gmail\n").unwrap(), vec!["get", "Gmail"]);
        assert!(split_line("   \n").unwrap().is_empty());
    }

    #[test]
    fn test_split_quoted_words() {
        assert_eq!(
            split_line(r#"add "Work Email" -u 'me at work'"#).unwrap(),
            vec!["add", "Work Email", "-u", "me at work"]
        );
        assert_eq!(split_line(r#"add x -n """#).unwrap(), vec!["add", "x", "-n", ""]);
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert!(split_line(r#"get "Gmail"#).is_err());
    }

    #[test]
    fn test_parse_shell_commands() {
        let add = ShellLine::try_parse_from(["add", "Gmail", "-u", "a@b.com"]).unwrap();
        assert!(matches!(
            add.command,
            ShellCommand::Vault(Command::Add { ref name, ref username, generate: false, .. })
                if name == "Gmail" && username == "a@b.com"
        ));

        let quit = ShellLine::try_parse_from(["quit"]).unwrap();
        assert!(matches!(quit.command, ShellCommand::Exit));
    }

    #[test]
    fn test_export_path_defaults() {
        let export = ShellLine::try_parse_from(["export"]).unwrap();
        assert!(matches!(
            export.command,
            ShellCommand::Vault(Command::Export { ref path }) if path.as_os_str() == "export.csv"
        ));

        let delete = ShellLine::try_parse_from(["delete", "Gmail", "--yes"]).unwrap();
        assert!(matches!(
            delete.command,
            ShellCommand::Vault(Command::Delete { yes: true, .. })
        ));
    }

    #[test]
    fn test_shell_rejects_top_level_commands() {
        assert!(ShellLine::try_parse_from(["init"]).is_err());
        assert!(ShellLine::try_parse_from(["shell"]).is_err());
    }

    #[test]
    fn test_help_is_reported_as_display_help() {
        let err = ShellLine::try_parse_from(["help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
