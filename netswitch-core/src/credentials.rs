//! Known-network discovery: stored NetworkManager profiles intersected with
//! the SSIDs the host radio can currently see.

use crate::traits::{KnownNetworkSet, NetworkCredential, NetworkScanner, RecordSource};
use crate::{Error, Result};
use ini::{Ini, ParseOption};
use std::collections::HashSet;
use std::sync::Arc;

const WIFI_SECTIONS: &[&str] = &["wifi", "802-11-wireless"];
const SECURITY_SECTIONS: &[&str] = &["wifi-security", "802-11-wireless-security"];
const ENTERPRISE_SECTIONS: &[&str] = &["802-1x"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SsidDecodeError {
    #[error("'{0}' is not a byte value")]
    ByteOutOfRange(String),

    #[error("decoded bytes are not valid UTF-8")]
    NotUtf8,
}

fn is_escaped_form(raw: &str) -> bool {
    let Some(body) = raw.strip_suffix(';') else {
        return false;
    };
    !body.is_empty()
        && body
            .split(';')
            .all(|part| !part.is_empty() && part.len() <= 3 && part.bytes().all(|b| b.is_ascii_digit()))
}

/// Decodes the keyfile's numeric-byte SSID form (`"82;101;116;"` is `"Ret"`).
///
/// Anything not in that form is returned unchanged, so decoding an
/// already-plain SSID is a no-op.
pub fn decode_ssid(raw: &str) -> std::result::Result<String, SsidDecodeError> {
    if !is_escaped_form(raw) {
        return Ok(raw.to_string());
    }
    let bytes = raw
        .trim_end_matches(';')
        .split(';')
        .map(|part| {
            part.parse::<u8>()
                .map_err(|_| SsidDecodeError::ByteOutOfRange(part.to_string()))
        })
        .collect::<std::result::Result<Vec<u8>, _>>()?;
    String::from_utf8(bytes).map_err(|_| SsidDecodeError::NotUtf8)
}

/// Undoes GKeyFile value escapes (`\s`, `\n`, `\t`, `\r`, `\\`).
/// Unknown escapes and a trailing backslash are kept as written.
fn unescape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn lookup(ini: &Ini, sections: &[&str], key: &str) -> Option<String> {
    sections
        .iter()
        .find_map(|section| ini.get_from(Some(*section), key))
        .filter(|value| !value.is_empty())
        .map(unescape_value)
}

/// Parses one keyfile into a credential.
///
/// `Ok(None)` means the record is valid but not usable here: not a Wi-Fi
/// profile, or an open network without a secret.
pub fn parse_record(
    name: &str,
    content: &str,
    decode_escaped_ssids: bool,
) -> Result<Option<NetworkCredential>> {
    let unusable = |reason: String| Error::CredentialRead {
        record: name.to_string(),
        reason,
    };

    // 关闭 ini 自带的引号与转义处理，GKeyFile 转义由 lookup 还原
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(content, options).map_err(|e| unusable(e.to_string()))?;

    let Some(raw_ssid) = lookup(&ini, WIFI_SECTIONS, "ssid") else {
        tracing::debug!("Record '{}' has no Wi-Fi SSID, ignoring", name);
        return Ok(None);
    };

    let ssid = if decode_escaped_ssids {
        decode_ssid(&raw_ssid).unwrap_or_else(|e| {
            tracing::warn!("Record '{}': cannot decode SSID '{}' ({}), using it as is", name, raw_ssid, e);
            raw_ssid.clone()
        })
    } else {
        raw_ssid
    };

    let psk = lookup(&ini, SECURITY_SECTIONS, "psk");
    let enterprise = lookup(&ini, ENTERPRISE_SECTIONS, "identity")
        .zip(lookup(&ini, ENTERPRISE_SECTIONS, "password"));

    match (psk, enterprise) {
        (Some(psk), None) => Ok(Some(NetworkCredential::psk(ssid, psk))),
        (None, Some((identity, password))) => {
            Ok(Some(NetworkCredential::enterprise(ssid, identity, password)))
        }
        (Some(_), Some(_)) => Err(unusable(
            "both a psk and 802-1x identity/password are present".into(),
        )),
        (None, None) => {
            tracing::debug!("Record '{}' ({}) carries no usable secret, ignoring", name, ssid);
            Ok(None)
        }
    }
}

/// Produces the set of known networks that are currently in range.
pub struct CredentialStore {
    records: Arc<dyn RecordSource>,
    scanner: Arc<dyn NetworkScanner>,
    decode_escaped_ssids: bool,
}

impl CredentialStore {
    pub fn new(records: Arc<dyn RecordSource>, scanner: Arc<dyn NetworkScanner>) -> Self {
        Self {
            records,
            scanner,
            decode_escaped_ssids: true,
        }
    }

    pub fn with_ssid_decoding(mut self, enabled: bool) -> Self {
        self.decode_escaped_ssids = enabled;
        self
    }

    async fn load(&self, name: &str) -> Result<Option<NetworkCredential>> {
        let content = self
            .records
            .read_record(name)
            .await
            .map_err(|e| Error::CredentialRead {
                record: name.to_string(),
                reason: e.to_string(),
            })?;
        parse_record(name, &content, self.decode_escaped_ssids)
    }

    /// Known networks currently in range, deduplicated by SSID.
    ///
    /// Never fails: unreadable or malformed records are logged and skipped,
    /// and a failed scan or listing yields whatever could be gathered.
    pub async fn list(&self) -> KnownNetworkSet {
        let available: HashSet<String> = match self.scanner.visible_ssids().await {
            Ok(ssids) => ssids,
            Err(e) => {
                tracing::warn!("Listing visible networks failed: {}", e);
                HashSet::new()
            }
        };

        let mut set = KnownNetworkSet::new();
        if available.is_empty() {
            tracing::debug!("No networks in range, skipping credential records");
            return set;
        }

        let mut names = match self.records.list_records().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("Listing credential records failed: {}", e);
                return set;
            }
        };
        // 按名称排序，保证同名 SSID 的覆盖顺序可复现
        names.sort();

        for name in &names {
            let credential = match self.load(name).await {
                Ok(Some(credential)) => credential,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Skipping record: {}", e);
                    continue;
                }
            };
            if available.contains(&credential.ssid) {
                if set.insert(credential).is_some() {
                    tracing::debug!("Record '{}' overrides an earlier profile for the same SSID", name);
                }
            }
        }

        tracing::debug!("Known in-range networks: {:?}", set.ssids());
        set
    }
}
