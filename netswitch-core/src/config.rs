use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONNECTIONS_DIR: &str = "/etc/NetworkManager/system-connections";
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// 顶层应用配置
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub credentials: CredentialsConfig,
    pub poll_interval: Duration,
    pub nmcli: String,
}

// ============= 串口配置 =============

#[derive(Debug, Clone, PartialEq)]
pub struct SerialConfig {
    /// Explicit device path; skips discovery when set.
    pub port: Option<String>,
    pub port_patterns: Vec<String>,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    /// Quiet period after opening the port, the board resets on open.
    pub settle: Duration,
}

// ============= 凭据配置 =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// Read records through `sudo cat`.
    Sudo,
    /// Read records directly; the process already has the rights.
    Direct,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CredentialsConfig {
    pub connections_dir: PathBuf,
    pub privilege: Privilege,
    pub decode_escaped_ssids: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfigFile::default().into()
    }
}

/// 用于解析 TOML 的临时结构
#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct AppConfigFile {
    serial: SerialToml,
    credentials: CredentialsToml,
    reconciler: ReconcilerToml,
    network_manager: NetworkManagerToml,
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SerialToml {
    port: Option<String>,
    port_patterns: Vec<String>,
    baud_rate: u32,
    read_timeout_ms: u64,
    settle_ms: u64,
}

impl Default for SerialToml {
    fn default() -> Self {
        Self {
            port: None,
            port_patterns: vec![
                "/dev/ttyUSB*".into(),
                "/dev/ttyACM*".into(),
                "/dev/cu.usbserial-*".into(),
                "/dev/cu.usbmodem*".into(),
            ],
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 1000,
            settle_ms: 2000,
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CredentialsToml {
    connections_dir: PathBuf,
    privilege: Privilege,
    decode_escaped_ssids: bool,
}

impl Default for CredentialsToml {
    fn default() -> Self {
        Self {
            connections_dir: PathBuf::from(DEFAULT_CONNECTIONS_DIR),
            privilege: Privilege::Sudo,
            decode_escaped_ssids: true,
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ReconcilerToml {
    poll_interval_secs: u64,
}

impl Default for ReconcilerToml {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NetworkManagerToml {
    nmcli: String,
}

impl Default for NetworkManagerToml {
    fn default() -> Self {
        Self {
            nmcli: "nmcli".into(),
        }
    }
}

impl From<AppConfigFile> for AppConfig {
    fn from(t: AppConfigFile) -> Self {
        AppConfig {
            serial: SerialConfig {
                port: t.serial.port,
                port_patterns: t.serial.port_patterns,
                baud_rate: t.serial.baud_rate,
                read_timeout: Duration::from_millis(t.serial.read_timeout_ms),
                settle: Duration::from_millis(t.serial.settle_ms),
            },
            credentials: CredentialsConfig {
                connections_dir: t.credentials.connections_dir,
                privilege: t.credentials.privilege,
                decode_escaped_ssids: t.credentials.decode_escaped_ssids,
            },
            poll_interval: Duration::from_secs(t.reconciler.poll_interval_secs),
            nmcli: t.network_manager.nmcli,
        }
    }
}

impl AppConfig {
    fn validate(self) -> Result<Self> {
        if self.poll_interval.is_zero() {
            return Err(Error::Config("reconciler.poll_interval_secs must be > 0".into()));
        }
        if self.serial.read_timeout.is_zero() {
            return Err(Error::Config("serial.read_timeout_ms must be > 0".into()));
        }
        if self.serial.port.is_none() && self.serial.port_patterns.is_empty() {
            return Err(Error::Config(
                "either serial.port or serial.port_patterns must be set".into(),
            ));
        }
        Ok(self)
    }
}

// ============= 配置加载函数 =============

/// 从 TOML 字符串加载应用配置
pub fn load_config_from_toml_str(s: &str) -> Result<AppConfig> {
    let parsed: AppConfigFile =
        toml::from_str(s).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))?;
    AppConfig::from(parsed).validate()
}

/// Loads the configuration file at `path`.
pub async fn load_config(path: &Path) -> Result<AppConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    load_config_from_toml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = load_config_from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.read_timeout, Duration::from_secs(1));
        assert_eq!(config.credentials.privilege, Privilege::Sudo);
        assert!(config.credentials.decode_escaped_ssids);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = load_config_from_toml_str(
            r#"
            [serial]
            port = "/dev/ttyACM3"

            [credentials]
            privilege = "direct"
            decode_escaped_ssids = false

            [reconciler]
            poll_interval_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyACM3"));
        assert_eq!(config.serial.settle, Duration::from_secs(2));
        assert_eq!(config.credentials.privilege, Privilege::Direct);
        assert!(!config.credentials.decode_escaped_ssids);
        assert_eq!(
            config.credentials.connections_dir,
            PathBuf::from(DEFAULT_CONNECTIONS_DIR)
        );
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.nmcli, "nmcli");
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = load_config_from_toml_str("[reconciler]\npoll_interval_secs = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = load_config_from_toml_str("[serial]\nbaud = 9600\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
