use crate::traits::{KnownNetworkSet, NetworkCredential, Secret};

/// Prefix the board puts in front of the SSID it measured fastest.
pub const FASTEST_PREFIX: &str = "[NEW_FASTEST]";

const FIELD_SEPARATOR: char = ':';
const ENTRY_SEPARATOR: char = ',';

/// One line received from the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialLine {
    /// `[NEW_FASTEST]<ssid>`
    FastestAdvisory(String),
    /// Anything else the firmware prints.
    Diagnostic(String),
    /// Read timeout or a blank line.
    Empty,
}

impl SerialLine {
    pub fn parse(raw: &str) -> Self {
        let line = raw.trim();
        if line.is_empty() {
            return SerialLine::Empty;
        }
        match line.strip_prefix(FASTEST_PREFIX).map(str::trim) {
            Some(ssid) if !ssid.is_empty() => SerialLine::FastestAdvisory(ssid.to_string()),
            _ => SerialLine::Diagnostic(line.to_string()),
        }
    }
}

fn wire_fields(credential: &NetworkCredential) -> Vec<&str> {
    match &credential.secret {
        Secret::Psk(psk) => vec![credential.ssid.as_str(), psk.as_str()],
        Secret::Enterprise { identity, password } => {
            vec![credential.ssid.as_str(), identity.as_str(), password.as_str()]
        }
    }
}

/// Renders the snapshot line: `ssid:psk` or `ssid:identity:password`
/// entries joined by `,`, terminated by `\n`.
///
/// The format has no escaping. Entries with a field containing `:`, `,` or a
/// line break cannot be represented and are left out with a warning.
pub fn encode_snapshot(networks: &KnownNetworkSet) -> String {
    let entries: Vec<String> = networks
        .iter()
        .filter_map(|credential| {
            let fields = wire_fields(credential);
            let unsafe_field = fields.iter().any(|f| {
                f.contains([FIELD_SEPARATOR, ENTRY_SEPARATOR, '\n', '\r'])
            });
            if unsafe_field {
                tracing::warn!(
                    ssid = %credential.ssid,
                    "Network left out of snapshot: a field contains ':' or ','"
                );
                return None;
            }
            Some(fields.join(":"))
        })
        .collect();

    let mut line = entries.join(",");
    line.push('\n');
    line
}

/// Board-side reading of a snapshot line.
#[cfg(test)]
pub(crate) fn decode_snapshot(line: &str) -> Vec<NetworkCredential> {
    line.trim_end_matches(['\n', '\r'])
        .split(ENTRY_SEPARATOR)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let fields: Vec<&str> = entry.split(FIELD_SEPARATOR).collect();
            match fields.as_slice() {
                [ssid, psk] => Some(NetworkCredential::psk(*ssid, *psk)),
                [ssid, identity, password] => {
                    Some(NetworkCredential::enterprise(*ssid, *identity, *password))
                }
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_lines_are_recognised() {
        assert_eq!(
            SerialLine::parse("[NEW_FASTEST]NetA\r\n"),
            SerialLine::FastestAdvisory("NetA".into())
        );
        assert_eq!(
            SerialLine::parse("[NEW_FASTEST] Cafe Guest "),
            SerialLine::FastestAdvisory("Cafe Guest".into())
        );
    }

    #[test]
    fn other_lines_are_diagnostics_or_empty() {
        assert_eq!(
            SerialLine::parse("scan done, 4 APs\n"),
            SerialLine::Diagnostic("scan done, 4 APs".into())
        );
        assert_eq!(
            SerialLine::parse("[NEW_FASTEST]"),
            SerialLine::Diagnostic("[NEW_FASTEST]".into())
        );
        assert_eq!(
            SerialLine::parse("speed [NEW_FASTEST]NetA"),
            SerialLine::Diagnostic("speed [NEW_FASTEST]NetA".into())
        );
        assert_eq!(SerialLine::parse(""), SerialLine::Empty);
        assert_eq!(SerialLine::parse("  \r\n"), SerialLine::Empty);
    }

    #[test]
    fn single_psk_network_snapshot() {
        let set: KnownNetworkSet = [NetworkCredential::psk("Home", "secret1")]
            .into_iter()
            .collect();
        assert_eq!(encode_snapshot(&set), "Home:secret1\n");
    }

    #[test]
    fn mixed_snapshot_survives_board_side_parse() {
        let set: KnownNetworkSet = [
            NetworkCredential::psk("Home", "secret1"),
            NetworkCredential::enterprise("Campus", "alice@uni", "hunter2"),
            NetworkCredential::psk("Café 5G", "pa ss;word"),
        ]
        .into_iter()
        .collect();

        let line = encode_snapshot(&set);
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));

        let decoded: KnownNetworkSet = decode_snapshot(&line).into_iter().collect();
        assert_eq!(decoded, set);
    }

    #[test]
    fn reserved_characters_drop_the_entry() {
        let set: KnownNetworkSet = [
            NetworkCredential::psk("Home", "a:b"),
            NetworkCredential::psk("Office", "fine"),
            NetworkCredential::enterprise("Corp", "dom,user", "pw"),
        ]
        .into_iter()
        .collect();
        assert_eq!(encode_snapshot(&set), "Office:fine\n");
    }

    #[test]
    fn empty_set_is_a_bare_newline() {
        assert_eq!(encode_snapshot(&KnownNetworkSet::new()), "\n");
    }
}
