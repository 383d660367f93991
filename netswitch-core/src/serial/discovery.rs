use crate::{Error, Result};

/// Port names that look like a USB serial adapter or a CDC ACM board.
const ENUMERATED_MARKERS: &[&str] = &["USB", "usb", "ttyACM"];

/// Finds the scanner board.
///
/// The glob patterns are tried in order first, taking the lexicographically
/// first match of the first pattern that matches anything. If none match,
/// the ports reported by the OS are checked for a USB-looking name.
pub fn find_device(patterns: &[String]) -> Result<String> {
    if let Some(found) = first_glob_match(patterns)? {
        return Ok(found);
    }

    let enumerated = match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            tracing::debug!("Enumerating serial ports failed: {}", e);
            Vec::new()
        }
    };
    if let Some(found) = pick_enumerated(enumerated) {
        tracing::debug!("Serial device {} found by enumeration", found);
        return Ok(found);
    }

    Err(Error::Discovery(format!(
        "no serial device matches any of {:?}",
        patterns
    )))
}

fn pick_enumerated(mut names: Vec<String>) -> Option<String> {
    names.sort();
    names
        .into_iter()
        .find(|name| ENUMERATED_MARKERS.iter().any(|marker| name.contains(marker)))
}

fn first_glob_match(patterns: &[String]) -> Result<Option<String>> {
    for pattern in patterns {
        let paths = glob::glob(pattern)
            .map_err(|e| Error::Config(format!("bad serial port pattern '{}': {}", pattern, e)))?;
        let mut matches: Vec<String> = paths
            .flatten()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        matches.sort();
        if let Some(first) = matches.into_iter().next() {
            tracing::debug!("Serial device {} matched pattern {}", first, pattern);
            return Ok(Some(first));
        }
    }
    Ok(None)
}
