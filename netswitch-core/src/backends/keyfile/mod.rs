//! Readers for NetworkManager keyfiles under `system-connections/`.
//!
//! The directory itself is world-listable but the files are root-only, so
//! listing is always direct while reading goes through the injected
//! privilege mode.

use crate::traits::RecordSource;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use zeroize::Zeroizing;

async fn list_dir(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Reads keyfiles directly; the process must already be allowed to.
#[derive(Debug, Clone)]
pub struct DirectRecordSource {
    dir: PathBuf,
}

impl DirectRecordSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl RecordSource for DirectRecordSource {
    async fn list_records(&self) -> Result<Vec<String>> {
        list_dir(&self.dir).await
    }

    async fn read_record(&self, name: &str) -> Result<String> {
        Ok(tokio::fs::read_to_string(self.dir.join(name)).await?)
    }
}

/// Reads keyfiles through `sudo cat`.
///
/// With a password, it is fed to `sudo -S` on stdin; without one, `sudo -n`
/// relies on cached credentials or a NOPASSWD rule.
pub struct SudoRecordSource {
    dir: PathBuf,
    password: Option<Zeroizing<String>>,
}

impl SudoRecordSource {
    pub fn new(dir: impl Into<PathBuf>, password: Option<Zeroizing<String>>) -> Self {
        Self {
            dir: dir.into(),
            password,
        }
    }
}

#[async_trait]
impl RecordSource for SudoRecordSource {
    async fn list_records(&self) -> Result<Vec<String>> {
        list_dir(&self.dir).await
    }

    async fn read_record(&self, name: &str) -> Result<String> {
        let path = self.dir.join(name);

        let mut cmd = Command::new("sudo");
        match &self.password {
            Some(_) => cmd.arg("-S").arg("-p").arg(""),
            None => cmd.arg("-n"),
        };
        let mut child = cmd
            .arg("cat")
            .arg("--")
            .arg(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Some(password) = &self.password {
                stdin.write_all(password.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
            }
            // 关闭 stdin，避免 sudo 等待更多输入
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandFailed(format!(
                "sudo cat {} failed: {}",
                path.display(),
                err.trim()
            )));
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}
