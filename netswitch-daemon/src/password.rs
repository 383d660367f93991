use anyhow::{Result, bail};
use std::io::IsTerminal;
use std::process::Command;
use tokio::io::{AsyncBufReadExt, BufReader};
use zeroize::Zeroizing;

/// Environment variable checked before prompting.
pub const PASSWORD_ENV: &str = "NETSWITCH_SUDO_PASSWORD";

/// Turns terminal echo back on when dropped.
struct EchoGuard;

impl Drop for EchoGuard {
    fn drop(&mut self) {
        let _ = Command::new("stty").arg("echo").status();
    }
}

/// Root password used to read the protected connection files.
///
/// Taken from the environment, or asked for on the terminal. Without a
/// terminal, `None` is returned and sudo has to succeed non-interactively.
pub async fn obtain() -> Result<Option<Zeroizing<String>>> {
    if let Ok(value) = std::env::var(PASSWORD_ENV) {
        let password = Zeroizing::new(value);
        if password.is_empty() {
            bail!("{} is set but empty", PASSWORD_ENV);
        }
        return Ok(Some(password));
    }

    if !std::io::stdin().is_terminal() {
        tracing::warn!("No terminal to ask for the root password, relying on `sudo -n`");
        return Ok(None);
    }

    eprint!("Enter root password: ");
    let _echo = Command::new("stty")
        .arg("-echo")
        .status()
        .ok()
        .map(|_| EchoGuard);

    let mut line = Zeroizing::new(String::new());
    BufReader::new(tokio::io::stdin())
        .read_line(&mut *line)
        .await?;
    eprintln!();

    let password = Zeroizing::new(line.trim_end_matches(['\n', '\r']).to_string());
    if password.is_empty() {
        bail!("No root password provided");
    }
    Ok(Some(password))
}
