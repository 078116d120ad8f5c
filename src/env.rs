//! Environment sanitisation: replace the inherited environment with a
//! filtered subset built from an explicit allow-list and deny-list.
//!
//! Conceptually grounded on the teacher's `sudo::env::environment::should_keep`
//! (allow-then-deny filtering against pattern tables), but the matching
//! primitive is purpose-built: this program's patterns are plain prefixes,
//! or exact matches when the pattern ends in `=`, with no `*` wildcard, so
//! the teacher's glob engine (`wildcard_match`/`bracket_match`) is not
//! pulled in.

use crate::config::{SAFE_ENV_PATTERNS, SECURE_PATH, UNSAFE_ENV_PATTERNS};

/// `true` iff `pattern` matches `entry`, where `entry` is a full
/// `name=value` string. A pattern ending in `=` must match the variable
/// name exactly (up to and including the `=`); otherwise the pattern is a
/// plain prefix match on `entry`.
fn pattern_matches(pattern: &str, entry: &str) -> bool {
    if let Some(name) = pattern.strip_suffix('=') {
        entry
            .split_once('=')
            .map(|(entry_name, _)| entry_name == name)
            .unwrap_or(false)
    } else {
        entry.starts_with(pattern)
    }
}

fn is_allowed(entry: &str) -> bool {
    SAFE_ENV_PATTERNS.iter().any(|p| pattern_matches(p, entry))
        && !UNSAFE_ENV_PATTERNS.iter().any(|p| pattern_matches(p, entry))
}

/// Run the sanitiser over a captured snapshot of `name=value` entries,
/// returning the new environment as owned pairs. Pure function, so it can
/// be exercised without actually mutating the process environment.
pub fn sanitise(captured: impl IntoIterator<Item = String>) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for entry in captured {
        if entry.is_empty() {
            continue;
        }
        if !is_allowed(&entry) {
            continue;
        }
        let Some((name, value)) = entry.split_once('=') else {
            continue;
        };
        if name.is_empty() || value.is_empty() {
            continue;
        }
        if !result.iter().any(|(n, _)| n == name) {
            result.push((name.to_string(), value.to_string()));
        }
    }

    if let Some(path_entry) = result.iter_mut().find(|(n, _)| n == "PATH") {
        path_entry.1 = SECURE_PATH.to_string();
    } else {
        result.push(("PATH".to_string(), SECURE_PATH.to_string()));
    }

    result
}

/// Capture the process's current environment, clear it, then reinstall the
/// sanitised subset. Must run before any other library call that might
/// read or allocate based on the environment.
pub fn sanitise_process_environment() {
    let captured: Vec<String> = std::env::vars()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();

    for (key, _) in std::env::vars() {
        std::env::remove_var(key);
    }

    for (key, value) in sanitise(captured) {
        std::env::set_var(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<String> {
        pairs.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    #[test]
    fn keeps_allow_listed_entries() {
        let result = sanitise(entries(&[
            ("HTTP_HOST", "example.com"),
            ("REMOTE_ADDR", "10.0.0.1"),
            ("SECRET", "leak-me"),
        ]));
        let map: std::collections::HashMap<_, _> = result.into_iter().collect();
        assert_eq!(map.get("HTTP_HOST").map(String::as_str), Some("example.com"));
        assert_eq!(map.get("REMOTE_ADDR").map(String::as_str), Some("10.0.0.1"));
        assert!(!map.contains_key("SECRET"));
    }

    #[test]
    fn drops_http_proxy_even_though_http_prefix_matches() {
        let result = sanitise(entries(&[("HTTP_PROXY", "http://evil.example")]));
        assert!(result.iter().all(|(k, _)| k != "HTTP_PROXY"));
    }

    #[test]
    fn path_is_always_forced_to_secure_path() {
        let result = sanitise(entries(&[("PATH", "/evil/bin")]));
        let map: std::collections::HashMap<_, _> = result.into_iter().collect();
        assert_eq!(map.get("PATH").map(String::as_str), Some(SECURE_PATH));
    }

    #[test]
    fn path_present_even_when_absent_from_input() {
        let result = sanitise(entries(&[("HTTP_HOST", "example.com")]));
        let map: std::collections::HashMap<_, _> = result.into_iter().collect();
        assert_eq!(map.get("PATH").map(String::as_str), Some(SECURE_PATH));
    }

    #[test]
    fn skips_malformed_entries() {
        let result = sanitise(vec!["".to_string(), "HTTP_=".to_string(), "HTTP_NOVALUE=".to_string()]);
        assert!(result.iter().all(|(k, _)| k == "PATH"));
    }

    #[test]
    fn first_occurrence_wins_no_overwrite() {
        let result = sanitise(entries(&[("AUTH_TYPE", "Basic"), ("AUTH_TYPE", "Digest")]));
        let map: std::collections::HashMap<_, _> = result.into_iter().collect();
        assert_eq!(map.get("AUTH_TYPE").map(String::as_str), Some("Basic"));
    }
}
