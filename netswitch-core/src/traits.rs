use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::serial::SerialLine;

// 在这里定义共享的数据模型，以及所有宿主协作者（凭据读取、扫描、连接控制、串口）的 trait。

/// The secret half of a stored Wi-Fi profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Secret {
    /// Personal mode (WPA-PSK).
    Psk(String),
    /// Enterprise mode (802.1X).
    Enterprise { identity: String, password: String },
}

/// One known network the host can hand to the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkCredential {
    pub ssid: String,
    pub secret: Secret,
}

impl NetworkCredential {
    pub fn psk(ssid: impl Into<String>, psk: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            secret: Secret::Psk(psk.into()),
        }
    }

    pub fn enterprise(
        ssid: impl Into<String>,
        identity: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            ssid: ssid.into(),
            secret: Secret::Enterprise {
                identity: identity.into(),
                password: password.into(),
            },
        }
    }
}

/// Known networks currently in range, deduplicated by SSID.
///
/// Rebuilt from scratch on every reconciliation pass and never persisted.
/// Iteration is ordered by SSID so the wire snapshot is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownNetworkSet {
    networks: BTreeMap<String, NetworkCredential>,
}

impl KnownNetworkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a credential, replacing any earlier one with the same SSID.
    pub fn insert(&mut self, credential: NetworkCredential) -> Option<NetworkCredential> {
        self.networks.insert(credential.ssid.clone(), credential)
    }

    pub fn get(&self, ssid: &str) -> Option<&NetworkCredential> {
        self.networks.get(ssid)
    }

    pub fn ssids(&self) -> BTreeSet<String> {
        self.networks.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkCredential> {
        self.networks.values()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl FromIterator<NetworkCredential> for KnownNetworkSet {
    fn from_iter<I: IntoIterator<Item = NetworkCredential>>(iter: I) -> Self {
        let mut set = Self::new();
        for credential in iter {
            set.insert(credential);
        }
        set
    }
}

/// Source of stored credential records (one file per profile).
///
/// Reading a record may need elevated privilege; how that is obtained is up
/// to the implementation and is injected at construction.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Names of all records, in no particular order.
    async fn list_records(&self) -> crate::Result<Vec<String>>;

    /// Plaintext content of a single record.
    async fn read_record(&self, name: &str) -> crate::Result<String>;
}

/// 扫描能力：返回主机无线网卡当前能看到的 SSID 集合
#[async_trait]
pub trait NetworkScanner: Send + Sync {
    async fn visible_ssids(&self) -> crate::Result<HashSet<String>>;
}

/// Queries and mutates the host's active Wi-Fi connection.
#[async_trait]
pub trait ConnectionController: Send + Sync {
    /// SSID of the active connection, `None` when not associated.
    /// The answer may already be stale when the caller acts on it.
    async fn current_ssid(&self) -> crate::Result<Option<String>>;

    /// Asks the host network manager to join an already-known network.
    /// Success only means the command reported success.
    async fn switch_to(&self, ssid: &str) -> crate::Result<()>;
}

/// Line-framed link to the scanner device.
///
/// The write path and the read path must be usable from two tasks at once.
#[async_trait]
pub trait SerialChannel: Send + Sync {
    /// Pushes the full known-network snapshot as one line.
    async fn write_snapshot(&self, networks: &KnownNetworkSet) -> crate::Result<()>;

    /// Waits for the next line. A read timeout yields `SerialLine::Empty`.
    async fn read_line(&self) -> crate::Result<SerialLine>;
}
