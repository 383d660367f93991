use super::utils::{parse_active_ssid, parse_visible_ssids};
use crate::traits::{ConnectionController, NetworkScanner};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::process::Command;

// 通过调用 nmcli 命令行工具实现扫描与连接切换，适用于使用 NetworkManager 管理网络连接的 Linux 系统

#[derive(Debug, Clone)]
pub struct NmcliBackend {
    nmcli: String,
}

impl NmcliBackend {
    pub fn new(nmcli: impl Into<String>) -> Self {
        Self {
            nmcli: nmcli.into(),
        }
    }

    /// Runs nmcli and returns stdout, or `CommandFailed` with its stderr.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.nmcli).args(args).output().await?;
        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandFailed(format!(
                "nmcli {} failed: {}",
                args.join(" "),
                err.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for NmcliBackend {
    fn default() -> Self {
        Self::new("nmcli")
    }
}

#[async_trait]
impl NetworkScanner for NmcliBackend {
    async fn visible_ssids(&self) -> Result<HashSet<String>> {
        let stdout = self
            .run(&["-t", "-f", "SSID", "device", "wifi", "list"])
            .await?;
        Ok(parse_visible_ssids(&stdout))
    }
}

#[async_trait]
impl ConnectionController for NmcliBackend {
    async fn current_ssid(&self) -> Result<Option<String>> {
        let stdout = self
            .run(&["-t", "-f", "ACTIVE,SSID", "device", "wifi"])
            .await?;
        Ok(parse_active_ssid(&stdout))
    }

    async fn switch_to(&self, ssid: &str) -> Result<()> {
        tracing::info!("Switching to {} ...", ssid);
        let output = Command::new(&self.nmcli)
            .arg("device")
            .arg("wifi")
            .arg("connect")
            .arg(ssid)
            .output()
            .await
            .map_err(|e| Error::Switch {
                ssid: ssid.to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let reason = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(Error::Switch {
                ssid: ssid.to_string(),
                reason,
            });
        }
        Ok(())
    }
}
