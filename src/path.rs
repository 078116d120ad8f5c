//! Path canonicalisation, length probing, ancestor enumeration and
//! containment testing. Every path compared against configuration is
//! expected to have passed through [`canonicalise`] first (invariant 3).

use std::ffi::CString;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::cutils::pathconf;
use crate::error::Error;

/// Resolve symlinks and `.`/`..` components, returning an absolute,
/// fully-resolved path.
///
/// Fails with [`Error::NoInput`] if the path or any component does not
/// exist; [`Error::Unavailable`] if the result is empty or exceeds the
/// filesystem's path length limit.
pub fn canonicalise(path: &Path) -> Result<PathBuf, Error> {
    let real = fs::canonicalize(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            Error::NoInput(format!("{}: no such file or directory", path.display()))
        } else {
            Error::OsErr(format!("{}: {e}", path.display()))
        }
    })?;

    if real.as_os_str().is_empty() {
        return Err(Error::Unavailable(format!(
            "{}: canonicalisation produced an empty path",
            path.display()
        )));
    }

    let limit = path_max(&real);
    if real.as_os_str().len() as i64 >= limit {
        return Err(Error::Unavailable(format!(
            "{}: canonical path exceeds the path length limit",
            path.display()
        )));
    }

    Ok(real)
}

/// The historical minimum `PATH_MAX` on any POSIX system; used as a last
/// resort when neither the compile-time nor the runtime limit is usable.
const FALLBACK_PATH_MAX: i64 = 256;

/// `min(PATH_MAX if finite, pathconf(parent-dir, _PC_PATH_MAX) if finite,
/// 256)`.
///
/// If `path` is itself a directory, it is queried directly; otherwise its
/// parent directory is queried. (A previous draft of this check used
/// `st_mode & S_ISDIR`, which is wrong: `S_ISDIR` is a macro, not a bitmask.
/// This uses a proper type test instead.)
///
/// Should be called with the process's working directory set to `/` so
/// that the `pathconf` query is meaningful even if `path`'s directory
/// cannot itself be queried.
pub fn path_max(path: &Path) -> i64 {
    let is_dir = fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false);
    let dir: PathBuf = if is_dir {
        path.to_path_buf()
    } else {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };

    let runtime_max = CString::new(dir.as_os_str().as_bytes())
        .ok()
        .and_then(|c_dir| pathconf(&c_dir, libc::_PC_PATH_MAX));

    [Some(libc::PATH_MAX as i64), runtime_max, Some(FALLBACK_PATH_MAX)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(FALLBACK_PATH_MAX)
}

/// `parent(start), parent(parent(start)), …` up to, but not including,
/// `stop`; also terminates at `/` or `.` if `stop` is absent or never
/// reached. Paths are fresh, canonical-looking `PathBuf`s owned by the
/// caller; this is not itself a canonicalisation pass.
pub fn ancestors(start: &Path, stop: Option<&Path>) -> Vec<PathBuf> {
    let mut result = Vec::new();
    let mut current = start.to_path_buf();

    loop {
        let Some(parent) = current.parent() else {
            break;
        };
        if parent.as_os_str().is_empty() {
            break;
        }
        let parent = parent.to_path_buf();

        if let Some(stop) = stop {
            if parent == *stop {
                break;
            }
        }

        let is_terminal = parent == Path::new("/") || parent == Path::new(".");
        result.push(parent.clone());
        if is_terminal {
            break;
        }
        current = parent;
    }

    result
}

/// `child == parent`, or `child` begins with `parent` followed by a path
/// separator. Plain byte-string prefix comparison on already-canonicalised
/// paths; no lexical normalisation is performed here.
pub fn is_within(child: &Path, parent: &Path) -> bool {
    if child == parent {
        return true;
    }

    let child_bytes = child.as_os_str().as_bytes();
    let mut parent_bytes = parent.as_os_str().as_bytes().to_vec();
    if parent_bytes.last() != Some(&b'/') {
        parent_bytes.push(b'/');
    }

    child_bytes.starts_with(&parent_bytes[..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_within_basic() {
        assert!(is_within(Path::new("/srv/home/alice"), Path::new("/srv/home")));
        assert!(is_within(Path::new("/srv/home"), Path::new("/srv/home")));
        assert!(!is_within(Path::new("/srv/homefoo"), Path::new("/srv/home")));
        assert!(!is_within(Path::new("/tmp/evil.php"), Path::new("/srv/home")));
        assert!(is_within(Path::new("/anything"), Path::new("/")));
    }

    #[test]
    fn ancestors_stop_at_root() {
        let dirs = ancestors(Path::new("/a/b/c"), None);
        assert_eq!(
            dirs,
            vec![PathBuf::from("/a/b"), PathBuf::from("/a"), PathBuf::from("/")]
        );
    }

    #[test]
    fn ancestors_stop_at_given_dir() {
        let dirs = ancestors(Path::new("/a/b/c/d"), Some(&PathBuf::from("/a")));
        assert_eq!(dirs, vec![PathBuf::from("/a/b/c"), PathBuf::from("/a/b")]);
    }

    #[test]
    fn ancestors_empty_when_parent_is_stop() {
        let dirs = ancestors(Path::new("/a/b/c"), Some(&PathBuf::from("/a/b")));
        assert!(dirs.is_empty());
    }

    #[test]
    fn canonicalise_rejects_missing_path() {
        let err = canonicalise(Path::new("/no/such/path/at/all/hopefully"));
        assert!(matches!(err, Err(Error::NoInput(_))));
    }

    #[test]
    fn canonicalise_of_root() {
        assert_eq!(canonicalise(Path::new("/")).unwrap(), PathBuf::from("/"));
    }

    #[test]
    fn path_max_is_at_least_the_fallback() {
        assert!(path_max(Path::new("/")) >= FALLBACK_PATH_MAX);
    }
}
