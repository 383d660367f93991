use std::collections::HashSet;

/// Splits one line of `nmcli -t` output into fields.
///
/// Terse mode separates fields with `:` and escapes a literal `:` or `\`
/// inside a value with a backslash.
pub fn split_terse_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            ':' => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}

/// Parses `nmcli -t -f SSID device wifi list` into the set of visible SSIDs.
/// Hidden networks (empty SSID or `--`) are skipped.
pub fn parse_visible_ssids(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| split_terse_fields(line).into_iter().next())
        .filter(|ssid| !ssid.is_empty() && ssid != "--")
        .collect()
}

/// Parses `nmcli -t -f ACTIVE,SSID device wifi` and returns the SSID of the
/// row marked active, if any.
pub fn parse_active_ssid(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut fields = split_terse_fields(line).into_iter();
        match (fields.next().as_deref(), fields.next()) {
            (Some("yes"), Some(ssid)) if !ssid.is_empty() => Some(ssid),
            _ => None,
        }
    })
}
