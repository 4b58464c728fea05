//! Handshake name validation and cleanup of user supplied names.

/// Longest allowed name, in bytes.
pub const MAX_NAME_SIZE: usize = 63;

/// Names the chain refuses regardless of their characters.
const BLACKLIST: [&str; 5] = ["example", "invalid", "local", "localhost", "test"];

/// Checks that an encoded name is acceptable to the chain.
///
/// Accepts lowercase ASCII letters, digits, `-` and `_`, where `-` and `_`
/// may not start or end the name.
pub fn verify_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_SIZE {
        return false;
    }

    let last = name.len() - 1;
    let valid_chars = name.bytes().enumerate().all(|(i, ch)| match ch {
        b'0'..=b'9' | b'a'..=b'z' => true,
        b'-' | b'_' => i != 0 && i != last,
        _ => false,
    });

    valid_chars && !BLACKLIST.contains(&name)
}

/// Normalizes a name typed by a user: lowercases it and drops one trailing
/// `/` and then one trailing `.`, each optionally followed by spaces.
pub fn clean_name(raw: &str) -> String {
    let name = raw.to_lowercase();
    let name = strip_trailing(&name, '/');
    strip_trailing(name, '.').to_string()
}

fn strip_trailing(name: &str, suffix: char) -> &str {
    let trimmed = name.trim_end_matches(' ');
    trimmed.strip_suffix(suffix).unwrap_or(name)
}
