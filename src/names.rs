//! Portable username/group-name validation (POSIX.1-2018 3.437).

/// `true` iff `name` matches `[A-Za-z_][A-Za-z0-9._-]*` and is non-empty.
///
/// Applied to `WWW_USER`/`WWW_GROUP` at configuration-validation time and to
/// resolved owner names before they are trusted as identities.
pub fn is_portable(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::is_portable;

    #[test]
    fn accepts_portable_names() {
        assert!(is_portable("www-data"));
        assert!(is_portable("_apt"));
        assert!(is_portable("alice"));
        assert!(is_portable("alice.bob"));
        assert!(is_portable("a"));
    }

    #[test]
    fn rejects_non_portable_names() {
        assert!(!is_portable(""));
        assert!(!is_portable("1alice"));
        assert!(!is_portable("-alice"));
        assert!(!is_portable("alice bob"));
        assert!(!is_portable("alice/bob"));
        assert!(!is_portable("../etc"));
    }
}
