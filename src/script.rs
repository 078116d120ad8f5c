//! Script resolver: reads `PATH_TRANSLATED`/`DOCUMENT_ROOT` out of the
//! already-sanitised environment and asserts every containment and type
//! invariant before a single byte of the script is trusted.

use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::config::{SCRIPT_BASE_DIR, SCRIPT_SUFFIX};
use crate::error::Error;
use crate::path::{canonicalise, is_within};

pub struct ScriptDescriptor {
    pub path: PathBuf,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    pub document_root: PathBuf,
}

/// Reads `PATH_TRANSLATED`/`DOCUMENT_ROOT` from the process environment
/// (already sanitised by the time this runs), and checks:
/// regular file, containment in `SCRIPT_BASE_DIR`, `SCRIPT_SUFFIX` match,
/// containment in `DOCUMENT_ROOT`.
///
/// Owner's home-directory containment is checked separately once the
/// owner is resolved, since it depends on a later stage's output.
pub fn resolve() -> Result<ScriptDescriptor, Error> {
    let path_translated = std::env::var("PATH_TRANSLATED")
        .map_err(|_| Error::NoInput("PATH_TRANSLATED is missing or not valid UTF-8".into()))?;
    if path_translated.is_empty() {
        return Err(Error::NoInput("PATH_TRANSLATED is empty".into()));
    }

    let document_root_raw = std::env::var("DOCUMENT_ROOT")
        .map_err(|_| Error::NoInput("DOCUMENT_ROOT is missing or not valid UTF-8".into()))?;
    if document_root_raw.is_empty() {
        return Err(Error::NoInput("DOCUMENT_ROOT is empty".into()));
    }

    let script_path = canonicalise(Path::new(&path_translated))?;
    let meta = std::fs::symlink_metadata(&script_path)?;
    if !meta.is_file() {
        return Err(Error::Unavailable(format!("{}: not a regular file", script_path.display())));
    }

    let base_dir = canonicalise(Path::new(SCRIPT_BASE_DIR))?;
    if !is_within(&script_path, &base_dir) {
        return Err(Error::Unavailable(format!(
            "{}: not within {}",
            script_path.display(),
            base_dir.display()
        )));
    }

    if !has_suffix(&script_path, SCRIPT_SUFFIX) {
        return Err(Error::Unavailable(format!(
            "{}: does not end in {SCRIPT_SUFFIX}",
            script_path.display()
        )));
    }

    let document_root = canonicalise(Path::new(&document_root_raw))?;
    if !is_within(&script_path, &document_root) {
        return Err(Error::Unavailable(format!(
            "{}: not within document root {}",
            script_path.display(),
            document_root.display()
        )));
    }

    Ok(ScriptDescriptor {
        path: script_path,
        uid: meta.uid(),
        gid: meta.gid(),
        mode: meta.permissions().mode(),
        document_root,
    })
}

/// Exact, case-sensitive suffix match on the last filename component.
/// `suffix` must include the leading dot.
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(suffix) && n.len() > suffix.len())
}

impl ScriptDescriptor {
    /// Re-stats the script and checks the owner-resolver's mode invariant:
    /// not world-writable, no setuid, no setgid. Run again right before
    /// the privilege drop, since the filesystem could have changed between
    /// the first stat and now.
    pub fn recheck_mode(&self) -> Result<(), Error> {
        let meta = std::fs::symlink_metadata(&self.path)?;
        let mode = meta.permissions().mode();
        if mode & libc::S_IWOTH != 0 {
            return Err(Error::NoPerm(format!("{}: world-writable", self.path.display())));
        }
        if mode & (libc::S_ISUID | libc::S_ISGID) != 0 {
            return Err(Error::NoPerm(format!("{}: setuid/setgid bit set", self.path.display())));
        }
        Ok(())
    }

    /// Owner-home containment, checked once the owner's home directory is
    /// known.
    pub fn require_within_home(&self, owner_home: &Path) -> Result<(), Error> {
        if !is_within(&self.path, owner_home) {
            return Err(Error::Unavailable(format!(
                "{}: not within owner's home {}",
                self.path.display(),
                owner_home.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_match_is_exact_and_case_sensitive() {
        assert!(has_suffix(Path::new("/srv/app.php"), ".php"));
        assert!(!has_suffix(Path::new("/srv/app.PHP"), ".php"));
        assert!(!has_suffix(Path::new("/srv/app.phps"), ".php"));
        assert!(!has_suffix(Path::new("/srv/.php"), ".php"));
        assert!(!has_suffix(Path::new("/srv/appphp"), ".php"));
    }
}
